//! End-to-end clustering scenarios through the public API.

use approx::assert_abs_diff_eq;
use rstest::rstest;

use statetie::data::{StateContext, WordPosition};
use statetie::math::LogMode;
use statetie::questions::{CompositeQuestion, Question};
use statetie::testing::{
    attach_random_gaussians, four_state_corpus, four_state_questions, random_corpus,
    random_questions,
};
use statetie::training::{DensityKind, QuestionStrategy, Verbosity};
use statetie::{
    ClusterConfig, ClusterTree, GrowthStrategy, ParseOptions, PhoneInventory, QuestionSet,
    TreeGrower,
};

fn sorted_clusters(tree: &ClusterTree) -> Vec<Vec<u32>> {
    let mut clusters = tree.clusters();
    clusters.sort();
    clusters
}

// =============================================================================
// Four-state scenario
// =============================================================================

#[rstest]
#[case::work_list(GrowthStrategy::WorkList)]
#[case::best_first(GrowthStrategy::BestFirst)]
fn four_states_split_by_left_phone(#[case] growth: GrowthStrategy) {
    let corpus = four_state_corpus();
    let questions = four_state_questions();
    let config = ClusterConfig::builder().growth(growth).build().unwrap();
    let tree = TreeGrower::new(&corpus, &questions, config).unwrap().grow().unwrap();

    assert_eq!(tree.n_nodes(), 3);
    assert_eq!(tree.clusters(), vec![vec![0, 1], vec![2, 3]]);

    // The question and its negation tie; the lower index wins.
    let root = tree.node(tree.root());
    assert_eq!(root.question(), Some(&Question::Composite(CompositeQuestion::single(0))));
    // Parent entropy 1.469 bits per unit mass, children 0.469: gain is 4 bits.
    assert_abs_diff_eq!(root.gain(), 4.0, epsilon = 1e-9);
    assert_abs_diff_eq!(tree.total_leaf_entropy(), 4.0 * 0.468_995_593_9, epsilon = 1e-6);
}

#[test]
fn quantized_logs_choose_the_same_question() {
    let corpus = four_state_corpus();
    let questions = four_state_questions();
    let native = TreeGrower::new(&corpus, &questions, ClusterConfig::default())
        .unwrap()
        .grow()
        .unwrap();
    let config = ClusterConfig::builder().log_mode(LogMode::Quantized).build().unwrap();
    let quantized = TreeGrower::new(&corpus, &questions, config).unwrap().grow().unwrap();

    assert_eq!(quantized.clusters(), native.clusters());
    assert_eq!(quantized.node(0).question(), native.node(0).question());
    assert_abs_diff_eq!(quantized.node(0).gain(), native.node(0).gain(), epsilon = 1e-2);
}

#[test]
fn two_class_split_recovers_the_groups() {
    let corpus = four_state_corpus();
    let questions = four_state_questions();
    let mut config = ClusterConfig::default();
    config.search.strategy = QuestionStrategy::TwoClassOnly;
    let tree = TreeGrower::new(&corpus, &questions, config).unwrap().grow().unwrap();

    assert_eq!(sorted_clusters(&tree), vec![vec![0, 1], vec![2, 3]]);
    assert!(matches!(tree.node(0).question(), Some(Question::Cluster(_))));
    assert_abs_diff_eq!(tree.node(0).gain(), 4.0, epsilon = 1e-9);
}

#[test]
fn classify_unseen_context() {
    let corpus = four_state_corpus();
    let questions = four_state_questions();
    let tree = TreeGrower::new(&corpus, &questions, ClusterConfig::default())
        .unwrap()
        .grow()
        .unwrap();
    let (yes, no) = tree.node(0).children().unwrap();

    let left_one = StateContext::triphone(1, 10, 20, WordPosition::Begin);
    let left_three = StateContext::triphone(3, 10, 20, WordPosition::Begin);
    assert_eq!(tree.classify(&questions, 99, &left_one), yes);
    assert_eq!(tree.classify(&questions, 99, &left_three), no);
}

#[test]
fn dump_lists_every_node() {
    let corpus = four_state_corpus();
    let questions = four_state_questions();
    let tree = TreeGrower::new(&corpus, &questions, ClusterConfig::default())
        .unwrap()
        .grow()
        .unwrap();

    let dump = tree.dump(&questions);
    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "n_node 3");
    assert!(lines[1].starts_with("0 1 2 "), "{}", lines[1]);
    assert!(lines[1].ends_with("(GROUP_A -1)"), "{}", lines[1]);
    assert!(lines[2].starts_with("1 - - "), "{}", lines[2]);
    assert!(lines[3].starts_with("2 - - "), "{}", lines[3]);

    // Display does not know question names.
    assert!(tree.to_string().lines().nth(1).unwrap().ends_with("(#0)"));
}

// =============================================================================
// Parsed questions
// =============================================================================

#[test]
fn parsed_question_file_drives_growth() {
    let phones = PhoneInventory::from_names(["p0", "p1", "p2", "p3"]);
    let text = "\
# phone classes
FRONT p0 p1
BACK  p2 p3 zz   # unknown phone is skipped
WDBNDRY_B
";
    let options =
        ParseOptions { offsets: vec![-1], verbosity: Verbosity::Silent, ..Default::default() };
    let questions = QuestionSet::parse(text, &phones, &options).unwrap();
    assert_eq!(questions.len(), 6);

    let corpus = four_state_corpus();
    let tree = TreeGrower::new(&corpus, &questions, ClusterConfig::default())
        .unwrap()
        .grow()
        .unwrap();
    assert_eq!(sorted_clusters(&tree), vec![vec![0, 1], vec![2, 3]]);
    assert!(tree.dump(&questions).contains("(FRONT -1)"));
}

// =============================================================================
// Larger corpora
// =============================================================================

#[test]
fn continuous_densities_grow_a_partition() {
    let mut corpus = random_corpus(60, 2, 4, 6, 21);
    attach_random_gaussians(&mut corpus, 3, 22);
    let questions = random_questions(6, 16, 23);
    let config = ClusterConfig::builder().density(DensityKind::Continuous).build().unwrap();
    let tree = TreeGrower::new(&corpus, &questions, config).unwrap().grow().unwrap();

    assert!(tree.n_leaves() > 1);
    let assignments = tree.assignments();
    assert_eq!(assignments.len(), corpus.len());
    assert!(corpus.ids().iter().all(|id| assignments.contains_key(id)));
    assert!(tree.total_leaf_entropy() < tree.node(0).weighted_entropy());
}

#[rstest]
#[case::two_threads(2)]
#[case::all_cores(0)]
fn threads_do_not_change_the_tree(#[case] n_threads: usize) {
    let corpus = random_corpus(120, 2, 8, 10, 31);
    let questions = random_questions(10, 30, 32);
    let sequential = TreeGrower::new(&corpus, &questions, ClusterConfig::default())
        .unwrap()
        .grow()
        .unwrap();
    let config = ClusterConfig::builder().n_threads(n_threads).build().unwrap();
    let parallel = TreeGrower::new(&corpus, &questions, config).unwrap().grow().unwrap();

    assert_eq!(parallel.assignments(), sequential.assignments());
    assert_eq!(parallel.n_nodes(), sequential.n_nodes());
}

#[test]
fn regrowing_a_leaf_does_not_split_it() {
    let corpus = random_corpus(100, 1, 8, 8, 41);
    let questions = random_questions(8, 24, 42);
    let grower = TreeGrower::new(&corpus, &questions, ClusterConfig::default()).unwrap();
    let tree = grower.grow().unwrap();
    assert!(tree.n_leaves() > 1);

    for leaf in tree.leaves() {
        let members = tree.node(leaf).members();
        let regrown = grower.grow_members(members).unwrap();
        assert_eq!(regrown.n_nodes(), 1, "leaf {leaf} with {} members split again", members.len());
    }
}

#[test]
fn grow_members_matches_the_subtree() {
    let corpus = random_corpus(100, 1, 8, 8, 51);
    let questions = random_questions(8, 24, 52);
    let grower = TreeGrower::new(&corpus, &questions, ClusterConfig::default()).unwrap();
    let tree = grower.grow().unwrap();
    let (yes, _) = tree.node(0).children().unwrap();

    let subtree = grower.grow_members(tree.node(yes).members()).unwrap();
    let mut below_yes: Vec<Vec<u32>> = tree
        .leaves()
        .into_iter()
        .filter(|&leaf| {
            let mut node = leaf;
            while let Some(parent) = tree.node(node).parent() {
                if node == yes {
                    return true;
                }
                node = parent;
            }
            false
        })
        .map(|leaf| tree.node(leaf).members().to_vec())
        .collect();
    below_yes.sort();
    assert_eq!(sorted_clusters(&subtree), below_yes);
}
