use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use toxiscore::interactive::{render_verdict, run};
use toxiscore::{
    score, ClassificationMode, ClassifierError, Classify, LabelSchema, ScoringBranch,
    ToxicityClassifier, Verdict,
};

/// Binary head that calls everything with an exclamation mark toxic.
struct ShoutClassifier;

impl Classify for ShoutClassifier {
    fn classify(&self, text: &str) -> Result<Verdict, ClassifierError> {
        let schema = LabelSchema::new(
            Some(2),
            Some(vec!["non_toxic".into(), "toxic".into()]),
            ClassificationMode::SingleLabel,
        )?;
        let logits = if text.contains('!') { [0.0, 3.0] } else { [3.0, 0.0] };
        score(&logits, &schema, schema.id2label())
    }
}

fn run_session(input: &str) -> String {
    let mut output = Vec::new();
    run(&ShoutClassifier, Cursor::new(input.as_bytes()), &mut output).unwrap();
    String::from_utf8(output).unwrap()
}

#[test]
fn test_interactive_session() {
    let output = run_session("get lost!\n   \nnice photo\n:q\nnever read\n");
    assert!(output.contains("Toxic (Toxicity: 95.26%)\nReason(s): Toxic"));
    assert!(output.contains("Please enter some text!"));
    assert!(output.contains("Not Toxic (Confidence: 95.26%)"));
    assert_eq!(output.matches("Toxic (Toxicity").count(), 1);
    assert_eq!(output.matches("Not Toxic").count(), 1);
}

#[test]
fn test_interactive_ends_at_eof() {
    let output = run_session("hello");
    assert!(output.contains("Not Toxic"));
}

#[test]
fn test_render_without_categories() {
    let schema = LabelSchema::with_num_labels(3).unwrap();
    let verdict = score(&[2.0, -2.0, -2.0], &schema, None).unwrap();
    assert_eq!(render_verdict(&verdict), "Toxic (Toxicity: 88.08%)");
}

/// Directory holding an exported toxicity model (`model.onnx`,
/// `tokenizer.json`, optionally `config.json`).
fn model_dir() -> PathBuf {
    std::env::var("TOXIC_MODEL_LOCAL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("best_twitter_roberta"))
}

fn setup_classifier() -> ToxicityClassifier {
    ToxicityClassifier::builder()
        .with_model_dir(model_dir())
        .expect("Failed to load model")
        .build()
        .expect("Failed to create classifier")
}

#[test]
#[ignore = "requires an exported model in TOXIC_MODEL_LOCAL_DIR"]
fn test_real_model_end_to_end() {
    let classifier = setup_classifier();
    let info = classifier.info();
    assert!(info.num_labels > 0);
    assert_eq!(info.branch, ScoringBranch::select(info.num_labels, info.mode));

    let verdict = classifier.classify("Thank you so much, this was really helpful!").unwrap();
    assert!((verdict.toxicity_score + verdict.non_toxic_confidence - 1.0).abs() < 1e-6);
    assert!(!verdict.is_toxic());
}

#[test]
#[ignore = "requires an exported model in TOXIC_MODEL_LOCAL_DIR"]
fn test_real_model_truncates_long_input() {
    let classifier = setup_classifier();
    let long_text = "this comment keeps going and going ".repeat(400);
    let tokens = classifier.count_tokens(&long_text).unwrap();
    assert_eq!(tokens, classifier.info().max_sequence_length);
    assert!(classifier.classify(&long_text).is_ok());
}

#[test]
#[ignore = "requires an exported model in TOXIC_MODEL_LOCAL_DIR"]
fn test_real_model_thread_safety() {
    let classifier = Arc::new(setup_classifier());
    let handles: Vec<_> = (0..3)
        .map(|_| {
            let classifier = Arc::clone(&classifier);
            thread::spawn(move || {
                assert!(classifier.classify("test text").is_ok());
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
