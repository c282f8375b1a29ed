use tokenizers::{Encoding, Tokenizer};
use ort::session::Session;
use ndarray::Array2;
use ort::value::Tensor;
use std::collections::HashMap;

use super::error::ClassifierError;

/// Runs a sequence classification model over a piece of text and returns
/// its raw logits.
///
/// The ONNX model is expected to:
/// - Accept `input_ids` and `attention_mask` (shape [1, sequence_length]),
///   plus `token_type_ids` when the architecture declares it
/// - Output logits of shape [1, num_labels]
///
/// Truncation to the model's maximum length is configured on the tokenizer
/// when the classifier is built, so long comments are cut rather than rejected.
pub(crate) trait SequenceLogits {
    /// Returns the initialized tokenizer if available
    fn tokenizer(&self) -> Option<&Tokenizer>;

    /// Returns the initialized ONNX session if available
    fn session(&self) -> Option<&Session>;

    /// Counts the tokens the model will see, special tokens included and
    /// after truncation.
    fn count_tokens(&self, text: &str) -> Result<usize, ClassifierError> {
        self.encode(text).map(|encoding| encoding.get_ids().len())
    }

    /// Tokenizes text with the model's special tokens.
    ///
    /// # Errors
    /// - `TokenizerError` if the tokenizer is not initialized
    /// - `TokenizerError` if the text cannot be encoded
    fn encode(&self, text: &str) -> Result<Encoding, ClassifierError> {
        let tokenizer = self.tokenizer()
            .ok_or_else(|| ClassifierError::TokenizerError("Tokenizer not initialized".into()))?;

        let encoding = tokenizer.encode(text, true)
            .map_err(|e| ClassifierError::TokenizerError(e.to_string()))?;

        if encoding.get_ids().is_empty() {
            return Err(ClassifierError::TokenizerError("Tokenizer produced no tokens".into()));
        }
        Ok(encoding)
    }

    /// Tokenizes `text` and runs the model, returning one logit per label.
    fn logits(&self, text: &str) -> Result<Vec<f32>, ClassifierError> {
        let encoding = self.encode(text)?;
        self.run_logits(&encoding)
    }

    /// Runs the model on an encoded input.
    ///
    /// # Errors
    /// - `ModelError` if the session is not initialized
    /// - `ModelError` if tensor creation or model execution fails
    /// - `PredictionError` if the output is not a single row of logits
    fn run_logits(&self, encoding: &Encoding) -> Result<Vec<f32>, ClassifierError> {
        let session = self.session()
            .ok_or_else(|| ClassifierError::ModelError("Session not initialized".into()))?;

        let seq_len = encoding.get_ids().len();
        let to_row = |values: &[u32]| -> Result<Array2<i64>, ClassifierError> {
            Array2::from_shape_vec((1, seq_len), values.iter().map(|&x| x as i64).collect())
                .map_err(|e| ClassifierError::ModelError(format!("Failed to create input array: {}", e)))
        };

        let input_dyn = to_row(encoding.get_ids())?.into_dyn();
        let input_ids = input_dyn.as_standard_layout();
        let mask_dyn = to_row(encoding.get_attention_mask())?.into_dyn();
        let attention_mask = mask_dyn.as_standard_layout();
        let type_dyn = to_row(encoding.get_type_ids())?.into_dyn();
        let token_type_ids = type_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert("input_ids", Tensor::from_array(&input_ids)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to create input tensor: {}", e)))?);
        input_tensors.insert("attention_mask", Tensor::from_array(&attention_mask)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to create mask tensor: {}", e)))?);
        if session.inputs.iter().any(|input| input.name == "token_type_ids") {
            input_tensors.insert("token_type_ids", Tensor::from_array(&token_type_ids)
                .map_err(|e| ClassifierError::ModelError(format!("Failed to create type tensor: {}", e)))?);
        }

        let outputs = session.run(input_tensors)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to run model: {}", e)))?;
        let output_tensor = outputs[0].try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::ModelError(format!("Failed to extract output tensor: {}", e)))?;

        let shape = output_tensor.shape();
        let num_labels = shape.last().copied().unwrap_or(0);
        if num_labels == 0 || output_tensor.len() != num_labels {
            return Err(ClassifierError::PredictionError(format!(
                "Expected logits of shape [1, num_labels], got {:?}", shape
            )));
        }

        Ok(output_tensor.iter().copied().collect())
    }
}
