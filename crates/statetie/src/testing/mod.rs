//! Fixtures shared by unit tests, integration tests and benchmarks.

use ndarray::{array, Array2};
use rand::prelude::*;

use crate::data::{GaussianStats, StateContext, StateCorpus, WordPosition};
use crate::questions::{AtomicQuestion, QuestionSet};

/// Four single-stream states over four codewords.
///
/// States 0 and 1 are `[0.9, 0.1, 0, 0]`, states 2 and 3 are
/// `[0, 0, 0.1, 0.9]`. State `i` has left phone `i`.
pub fn four_state_corpus() -> StateCorpus {
    let rows = [
        array![[0.9, 0.1, 0.0, 0.0]],
        array![[0.9, 0.1, 0.0, 0.0]],
        array![[0.0, 0.0, 0.1, 0.9]],
        array![[0.0, 0.0, 0.1, 0.9]],
    ];
    let mut corpus = StateCorpus::with_capacity(1, 4, rows.len());
    for (id, counts) in rows.into_iter().enumerate() {
        let context = StateContext::triphone(id as u32, 10, 20, WordPosition::Internal);
        if let Err(e) = corpus.push(id as u32, context, counts) {
            panic!("fixture state {id}: {e}");
        }
    }
    corpus
}

/// "Is the left phone in {0, 1}" and its negation.
pub fn four_state_questions() -> QuestionSet {
    let question = AtomicQuestion::membership("GROUP_A", -1, [0, 1]);
    let negated = question.negate();
    QuestionSet::new(vec![question, negated])
}

/// Random corpus whose distributions depend on the context phones.
///
/// Each phone owns a peaked prototype distribution per stream; a state mixes
/// the prototypes of its left (70%) and right (30%) phones, scaled by a random
/// occupancy, with a little noise. External ids are sparse (`10 * i + 7`).
pub fn random_corpus(
    n_states: usize,
    n_streams: usize,
    n_codewords: usize,
    n_phones: u32,
    seed: u64,
) -> StateCorpus {
    let mut rng = StdRng::seed_from_u64(seed);
    let prototypes: Vec<Array2<f64>> = (0..n_phones)
        .map(|_| {
            let mut proto = Array2::from_shape_fn((n_streams, n_codewords), |_| {
                rng.gen::<f64>().powi(3)
            });
            for mut row in proto.rows_mut() {
                let total = row.sum().max(f64::MIN_POSITIVE);
                row.mapv_inplace(|v| v / total);
            }
            proto
        })
        .collect();

    let positions = [WordPosition::Begin, WordPosition::End, WordPosition::Internal, WordPosition::Single];
    let mut corpus = StateCorpus::with_capacity(n_streams, n_codewords, n_states);
    for i in 0..n_states {
        let left = rng.gen_range(0..n_phones);
        let base = rng.gen_range(0..n_phones);
        let right = rng.gen_range(0..n_phones);
        let position = positions[rng.gen_range(0..positions.len())];
        let occupancy = rng.gen_range(1.0..20.0);

        let mix = &prototypes[left as usize] * 0.7 + &prototypes[right as usize] * 0.3;
        let counts = mix.mapv(|p| occupancy * p + 0.01 * rng.gen::<f64>());

        let id = 10 * i as u32 + 7;
        let context = StateContext::triphone(left, base, right, position);
        if let Err(e) = corpus.push_with_mass(id, context, counts, occupancy) {
            panic!("fixture state {id}: {e}");
        }
    }
    corpus
}

/// Attach random diagonal Gaussians (`dim` dimensions per stream) whose means
/// depend on each state's left phone.
pub fn attach_random_gaussians(corpus: &mut StateCorpus, dim: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_streams = corpus.n_streams();
    for row in 0..corpus.len() as u32 {
        let id = corpus.external_id(row);
        let left = corpus.context(row).phone_at(-1).unwrap_or(0) as f64;
        let mean = Array2::from_shape_fn((n_streams, dim), |_| left + 0.1 * rng.gen::<f64>());
        let var = Array2::from_shape_fn((n_streams, dim), |_| 0.5 + rng.gen::<f64>());
        let stats = GaussianStats::new(corpus.mass(row), mean, var);
        if let Err(e) = corpus.attach_gaussian(id, stats) {
            panic!("fixture gaussian {id}: {e}");
        }
    }
}

/// `n_questions` random phone-set questions over `n_phones` phones.
///
/// Questions come in (question, negation) pairs on alternating offsets
/// `-1` and `+1`.
pub fn random_questions(n_phones: u32, n_questions: usize, seed: u64) -> QuestionSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut questions = QuestionSet::new(Vec::new());
    let mut k = 0;
    while questions.len() < n_questions {
        let size = rng.gen_range(1..n_phones.max(2));
        let mut phones: Vec<u32> = (0..n_phones).collect();
        phones.shuffle(&mut rng);
        phones.truncate(size as usize);

        let offset = if k % 2 == 0 { -1 } else { 1 };
        let question = AtomicQuestion::membership(format!("Q{k}"), offset, phones);
        let negated = question.negate();
        questions.push(question);
        questions.push(negated);
        k += 1;
    }
    questions
}
