//! Evidence scoring interface and the gradient-boosted tree ensemble implementing it
//!

use std::fs;

use camino::Utf8Path;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::{ModelLoadError, SchemaMismatchError, ScoreError};
use crate::evidence_features::feature_names;
use crate::prob_utils::{logistic, logit};

/// The default classifier model, compiled into the library
const BUNDLED_CLASSIFIER_MODEL: &[u8] = include_bytes!("../resources/sv_evidence_classifier.json");

/// Source label used in logs and run statistics when the bundled model is used
pub const BUNDLED_MODEL_LABEL: &str = "bundled";

/// Any function from an evidence feature vector to the probability the evidence is real
///
/// Scoring must not mutate shared state, so that one scorer can be used from many threads.
///
pub trait EvidenceScorer: Send + Sync {
    /// Names of the input features in the order expected by `score`
    fn feature_names(&self) -> &[String];

    fn feature_count(&self) -> usize {
        self.feature_names().len()
    }

    /// Probability in [0,1] that the evidence with these features is real
    fn score(&self, features: &[f64]) -> Result<f64, ScoreError>;
}

/// Check that the scorer input layout matches the evidence feature vector layout
///
pub fn check_feature_schema<S: EvidenceScorer + ?Sized>(scorer: &S) -> Result<(), SchemaMismatchError> {
    let expected_names = scorer.feature_names();
    let found_names = feature_names();
    if expected_names.len() != found_names.len() {
        return Err(SchemaMismatchError::FeatureCount {
            expected: expected_names.len(),
            found: found_names.len(),
        });
    }
    for (index, (expected, found)) in expected_names.iter().zip(found_names.iter()).enumerate() {
        if expected != found {
            return Err(SchemaMismatchError::FeatureName {
                index,
                expected: expected.clone(),
                found: found.to_string(),
            });
        }
    }
    debug!("Classifier feature schema matches {} evidence features", found_names.len());
    Ok(())
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Features less than threshold go left, missing (NaN) values follow default_left
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        default_left: bool,
    },
    Leaf {
        value: f64,
    },
}

/// A single regression tree, with the root at index 0
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= feature_count {
                    return Err(format!("node {index} splits on unknown feature {feature}"));
                }
                for child in [left, right] {
                    if *child <= index || *child >= self.nodes.len() {
                        return Err(format!("node {index} has invalid child index {child}"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Leaf value reached by the feature vector
    ///
    /// The tree must have been validated against the feature vector length.
    ///
    fn predict(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = features[*feature];
                    let go_left = if x.is_nan() {
                        *default_left
                    } else {
                        x < *threshold
                    };
                    index = if go_left { *left } else { *right };
                }
            }
        }
    }
}

/// Binary gradient-boosted tree ensemble with logistic output
///
/// `base_score` is the prior probability, to which the margin contribution of each tree is added
/// in tree order.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GradientBoostedClassifier {
    feature_names: Vec<String>,
    base_score: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedClassifier {
    pub fn new(
        feature_names: Vec<String>,
        base_score: f64,
        trees: Vec<RegressionTree>,
    ) -> Result<Self, String> {
        let x = Self {
            feature_names,
            base_score,
            trees,
        };
        x.validate()?;
        Ok(x)
    }

    fn validate(&self) -> Result<(), String> {
        if self.feature_names.is_empty() {
            return Err("no feature names".to_string());
        }
        if !(self.base_score > 0. && self.base_score < 1.) {
            return Err(format!(
                "base score must be in (0,1), found {}",
                self.base_score
            ));
        }
        if self.trees.is_empty() {
            return Err("no trees".to_string());
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_names.len())
                .map_err(|msg| format!("tree {index}: {msg}"))?;
        }
        Ok(())
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Raw log-odds score before the logistic transform
    pub fn margin(&self, features: &[f64]) -> Result<f64, ScoreError> {
        if features.len() != self.feature_names.len() {
            return Err(ScoreError::FeatureCount {
                expected: self.feature_names.len(),
                found: features.len(),
            });
        }
        let mut sum = logit(self.base_score);
        for tree in self.trees.iter() {
            sum += tree.predict(features);
        }
        Ok(sum)
    }
}

impl EvidenceScorer for GradientBoostedClassifier {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn score(&self, features: &[f64]) -> Result<f64, ScoreError> {
        Ok(logistic(self.margin(features)?))
    }
}

/// Parse model bytes as JSON if they look like a JSON document, and as MessagePack otherwise
///
fn parse_classifier(bytes: &[u8], origin: &str) -> Result<GradientBoostedClassifier, ModelLoadError> {
    let is_json = bytes
        .iter()
        .find(|x| !x.is_ascii_whitespace())
        .is_some_and(|&x| x == b'{');
    let model: GradientBoostedClassifier = if is_json {
        serde_json::from_slice(bytes).map_err(|e| ModelLoadError::Parse {
            origin: origin.to_string(),
            msg: e.to_string(),
        })?
    } else {
        rmp_serde::from_slice(bytes).map_err(|e| ModelLoadError::Parse {
            origin: origin.to_string(),
            msg: e.to_string(),
        })?
    };
    model.validate().map_err(|msg| ModelLoadError::Invalid {
        origin: origin.to_string(),
        msg,
    })?;
    Ok(model)
}

/// Load the classifier model from the given path, or the bundled default model if None
///
pub fn load_classifier(
    model_filename: Option<&Utf8Path>,
) -> Result<GradientBoostedClassifier, ModelLoadError> {
    let model = match model_filename {
        Some(filename) => {
            info!("Reading classifier model from file: '{filename}'");
            let bytes = fs::read(filename).map_err(|source| ModelLoadError::Io {
                source,
                path: filename.as_std_path().to_path_buf(),
            })?;
            parse_classifier(&bytes, &format!("file '{filename}'"))?
        }
        None => {
            info!("Reading {BUNDLED_MODEL_LABEL} classifier model");
            parse_classifier(BUNDLED_CLASSIFIER_MODEL, BUNDLED_MODEL_LABEL)?
        }
    };
    debug!(
        "Classifier model has {} trees over {} features",
        model.tree_count(),
        model.feature_count()
    );
    Ok(model)
}
