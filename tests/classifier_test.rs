use toxiscore::{
    resolve_label_names, score, ClassificationMode, LabelSchema, ScoringBranch, ToxicityLabel,
};
use toxiscore::classifier::labels::JIGSAW_LABELS;
use toxiscore::classifier::scoring::toxic_index;

const EPS: f64 = 1e-6;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[test]
fn test_single_logit_zero_is_non_toxic() {
    let schema = LabelSchema::with_num_labels(1).unwrap();
    let labels = resolve_label_names(&schema);
    let verdict = score(&[0.0], &schema, labels.as_deref()).unwrap();

    assert!((verdict.toxicity_score - 0.5).abs() < EPS);
    assert_eq!(verdict.label, ToxicityLabel::NonToxic);
    assert_eq!(verdict.categories.len(), 1);
    assert_eq!(verdict.categories["toxic"], false);
}

#[test]
fn test_single_logit_confidences_sum_to_one() {
    let schema = LabelSchema::with_num_labels(1).unwrap();
    for logit in [-12.5f32, -3.0, -0.2, 0.0, 0.1, 1.7, 9.0, 30.0] {
        let verdict = score(&[logit], &schema, None).unwrap();
        assert!((verdict.toxicity_score + verdict.non_toxic_confidence - 1.0).abs() < EPS);
        assert_eq!(verdict.is_toxic(), verdict.toxicity_score > 0.5);
        assert!(verdict.categories.is_empty());
    }
}

#[test]
fn test_binary_single_label_scenario() {
    let schema = LabelSchema::new(
        Some(2),
        Some(names(&["non_toxic", "toxic"])),
        ClassificationMode::SingleLabel,
    )
    .unwrap();
    let labels = resolve_label_names(&schema).unwrap();
    assert_eq!(toxic_index(&labels), 1);

    let verdict = score(&[0.0, 2.0], &schema, Some(&labels)).unwrap();
    assert!((verdict.toxicity_score - 0.880_797).abs() < EPS);
    assert_eq!(verdict.label, ToxicityLabel::Toxic);
    assert_eq!(verdict.categories["non_toxic"], false);
    assert_eq!(verdict.categories["toxic"], true);
    assert!((verdict.non_toxic_confidence - (1.0 - verdict.toxicity_score)).abs() < EPS);
}

#[test]
fn test_binary_selects_the_name_mentioning_toxic() {
    let schema = LabelSchema::with_num_labels(2).unwrap();

    let first = names(&["Toxic", "neutral"]);
    assert_eq!(toxic_index(&first), 0);
    let verdict = score(&[2.0, 0.0], &schema, Some(&first)).unwrap();
    assert!(verdict.is_toxic());
    assert_eq!(verdict.categories["Toxic"], true);
    assert_eq!(verdict.categories["neutral"], false);

    let second = names(&["clean", "very TOXIC"]);
    assert_eq!(toxic_index(&second), 1);
}

#[test]
fn test_binary_exact_half_is_non_toxic() {
    let schema = LabelSchema::with_num_labels(2).unwrap();
    let labels = names(&["non_toxic", "toxic"]);
    let verdict = score(&[1.25, 1.25], &schema, Some(&labels)).unwrap();

    assert_eq!(verdict.toxicity_score, 0.5);
    assert_eq!(verdict.label, ToxicityLabel::NonToxic);
    assert!(verdict.categories.values().all(|present| !present));
}

#[test]
fn test_binary_without_names_defaults_to_index_one() {
    let schema = LabelSchema::with_num_labels(2).unwrap();
    let verdict = score(&[-1.0, 1.0], &schema, None).unwrap();
    assert!(verdict.is_toxic());
    assert!(verdict.categories.is_empty());
}

#[test]
fn test_multi_label_jigsaw_scenario() {
    let schema = LabelSchema::new(Some(6), None, ClassificationMode::MultiLabel).unwrap();
    let labels = resolve_label_names(&schema).unwrap();
    let verdict = score(&[3.0, -3.0, -3.0, -3.0, -3.0, -3.0], &schema, Some(&labels)).unwrap();

    assert!((verdict.toxicity_score - 0.952_574).abs() < EPS);
    assert_eq!(verdict.label, ToxicityLabel::Toxic);
    let present: Vec<&str> = verdict.present_categories().collect();
    assert_eq!(present, vec!["toxic"]);
    assert_eq!(verdict.categories.len(), 6);
}

#[test]
fn test_multi_label_score_is_max_probability() {
    let schema = LabelSchema::new(Some(4), None, ClassificationMode::MultiLabel).unwrap();
    let cases: [[f32; 4]; 4] = [
        [-2.0, -1.0, -0.5, -4.0],
        [-2.0, 0.3, -0.5, -4.0],
        [5.0, 4.0, -0.5, 2.0],
        [0.0, 0.0, 0.0, 0.0],
    ];
    for logits in cases {
        let verdict = score(&logits, &schema, None).unwrap();
        let probs: Vec<f64> = logits.iter().map(|&x| sigmoid(f64::from(x))).collect();
        let max = probs.iter().copied().fold(f64::MIN, f64::max);
        assert!((verdict.toxicity_score - max).abs() < EPS);
        assert_eq!(verdict.is_toxic(), probs.iter().any(|&p| p > 0.5));
        assert!((verdict.non_toxic_confidence - (1.0 - max)).abs() < EPS);
    }
}

#[test]
fn test_multi_label_categories_are_independent() {
    let schema = LabelSchema::new(
        Some(3),
        Some(names(&["insult", "threat", "spam"])),
        ClassificationMode::MultiLabel,
    )
    .unwrap();
    let labels = resolve_label_names(&schema).unwrap();
    let verdict = score(&[2.0, 1.0, -1.0], &schema, Some(&labels)).unwrap();

    assert_eq!(verdict.categories["insult"], true);
    assert_eq!(verdict.categories["threat"], true);
    assert_eq!(verdict.categories["spam"], false);
}

#[test]
fn test_many_labels_override_single_label_mode() {
    assert_eq!(
        ScoringBranch::select(6, ClassificationMode::SingleLabel),
        ScoringBranch::MultiLabel
    );
    let schema = LabelSchema::new(Some(6), None, ClassificationMode::SingleLabel).unwrap();
    // Softmax would spread mass; independent sigmoids flag two labels.
    let verdict = score(&[2.0, 2.0, -5.0, -5.0, -5.0, -5.0], &schema, None).unwrap();
    assert!((verdict.toxicity_score - sigmoid(2.0)).abs() < EPS);
}

#[test]
fn test_two_labels_in_multi_label_mode_use_sigmoid() {
    let schema = LabelSchema::new(
        Some(2),
        Some(names(&["hate", "offensive"])),
        ClassificationMode::MultiLabel,
    )
    .unwrap();
    let verdict = score(&[1.0, 1.0], &schema, schema.id2label()).unwrap();
    assert!((verdict.toxicity_score - sigmoid(1.0)).abs() < EPS);
    assert_eq!(verdict.categories["hate"], true);
    assert_eq!(verdict.categories["offensive"], true);
}

#[test]
fn test_placeholder_names_become_jigsaw() {
    let placeholders: Vec<String> = (0..6).map(|i| format!("LABEL_{}", i)).collect();
    let schema = LabelSchema::new(Some(6), Some(placeholders), ClassificationMode::MultiLabel).unwrap();
    assert_eq!(resolve_label_names(&schema).unwrap(), names(&JIGSAW_LABELS));
}
