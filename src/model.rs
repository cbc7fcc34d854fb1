//! Yield Model
//!
//! The scoring step is an injected capability: anything implementing
//! [`YieldScorer`] maps a feature vector to a log-scale yield. The engine
//! only relies on it being deterministic for a fixed vector.
//!
//! [`TreeEnsembleModel`] is the production scorer. It evaluates a gradient
//! boosted tree ensemble exported as JSON:
//!
//! ```json
//! {
//!   "base_score": 0.5,
//!   "trees": [
//!     { "nodeid": 0, "split": "Avg_Temp", "split_condition": 27.5,
//!       "yes": 1, "no": 2, "missing": 1,
//!       "children": [ { "nodeid": 1, "leaf": 0.12 }, { "nodeid": 2, "leaf": -0.03 } ] }
//!   ]
//! }
//! ```
//!
//! Each entry of `trees` is one tree of an XGBoost `get_dump(dump_format="json")`.
//! Routing follows XGBoost: `value < split_condition` goes to `yes`, NaN to `missing`.

use crate::error::{EngineError, ScorerError};
use crate::features::{FeatureSchema, FeatureVector};
use anyhow::{anyhow, bail, Context, Result};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Vector in, log-scale yield out
pub trait YieldScorer: Send + Sync {
    fn score(&self, features: &FeatureVector) -> std::result::Result<f64, ScorerError>;
}

/// Undo the `log1p` target transform and clamp to non-negative tons/ha
pub fn inverse_log_yield(score: f64) -> f64 {
    score.exp_m1().max(0.0)
}

// ============================================================================
// Artifact format
// ============================================================================

fn default_base_score() -> f64 {
    0.5
}

#[derive(Debug, Deserialize)]
struct ModelArtifact {
    #[serde(default = "default_base_score")]
    base_score: f64,
    trees: Vec<DumpNode>,
}

#[derive(Debug, Deserialize)]
struct DumpNode {
    nodeid: usize,
    #[serde(default)]
    split: Option<String>,
    #[serde(default)]
    split_condition: Option<f64>,
    #[serde(default)]
    yes: Option<usize>,
    #[serde(default)]
    no: Option<usize>,
    #[serde(default)]
    missing: Option<usize>,
    #[serde(default)]
    leaf: Option<f64>,
    #[serde(default)]
    children: Vec<DumpNode>,
}

// ============================================================================
// Evaluation
// ============================================================================

#[derive(Debug, Clone)]
enum TreeNode {
    /// Internal split node; child fields index into the tree's node vec
    Split {
        feature: usize,
        threshold: f64,
        yes: usize,
        no: usize,
        missing: usize,
    },
    Leaf(f64),
}

#[derive(Debug, Clone)]
struct Tree {
    /// Root at index 0; children always follow their parent
    nodes: Vec<TreeNode>,
}

impl Tree {
    fn predict(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf(value) => return *value,
                TreeNode::Split { feature, threshold, yes, no, missing } => {
                    let value = features[*feature];
                    idx = if value.is_nan() {
                        *missing
                    } else if value < *threshold {
                        *yes
                    } else {
                        *no
                    };
                }
            }
        }
    }

    /// Flatten a nested dump into an index-addressed node list
    fn from_dump(root: &DumpNode, schema: &FeatureSchema) -> Result<Self> {
        // Pre-order walk: every child lands after its parent
        let mut order: Vec<&DumpNode> = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            order.push(node);
            for child in node.children.iter().rev() {
                stack.push(child);
            }
        }

        let mut position: FxHashMap<usize, usize> = FxHashMap::default();
        for (i, node) in order.iter().enumerate() {
            if position.insert(node.nodeid, i).is_some() {
                bail!("Duplicate nodeid {} in tree", node.nodeid);
            }
        }

        let mut nodes = Vec::with_capacity(order.len());
        for node in &order {
            if let Some(value) = node.leaf {
                if !node.children.is_empty() {
                    bail!("Leaf node {} has children", node.nodeid);
                }
                nodes.push(TreeNode::Leaf(value));
                continue;
            }

            let split = node.split.as_deref()
                .ok_or_else(|| anyhow!("Node {} has neither a leaf value nor a split", node.nodeid))?;
            let threshold = node.split_condition
                .ok_or_else(|| anyhow!("Split node {} has no split_condition", node.nodeid))?;
            let (yes, no) = match (node.yes, node.no) {
                (Some(yes), Some(no)) => (yes, no),
                _ => bail!("Split node {} is missing yes/no children", node.nodeid),
            };
            let missing = node.missing.unwrap_or(yes);

            // Only direct children are valid targets, which rules out cycles
            for target in [yes, no, missing] {
                if !node.children.iter().any(|c| c.nodeid == target) {
                    bail!("Split node {} routes to {} which is not one of its children", node.nodeid, target);
                }
            }

            nodes.push(TreeNode::Split {
                feature: resolve_feature(split, schema)?,
                threshold,
                yes: position[&yes],
                no: position[&no],
                missing: position[&missing],
            });
        }

        Ok(Self { nodes })
    }
}

/// Map a split name to a schema index; `f<N>` positional names are accepted
fn resolve_feature(name: &str, schema: &FeatureSchema) -> Result<usize> {
    if let Some(i) = schema.index_of(name) {
        return Ok(i);
    }

    name.strip_prefix('f')
        .and_then(|digits| digits.parse::<usize>().ok())
        .filter(|&i| i < schema.len())
        .ok_or_else(|| anyhow!("Model splits on '{}' which is not in the feature schema", name))
}

/// Gradient boosted tree ensemble: `base_score + Σ leaf`
#[derive(Debug, Clone)]
pub struct TreeEnsembleModel {
    base_score: f64,
    trees: Vec<Tree>,
    n_features: usize,
}

impl TreeEnsembleModel {
    /// Load a model artifact, resolving split features against the schema
    pub fn load(path: &Path, schema: &FeatureSchema) -> Result<Self> {
        if !path.exists() {
            return Err(EngineError::MissingArtifact(
                format!("model artifact not found at {}", path.display())
            ).into());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifact: {}", path.display()))?;

        Self::from_json_str(&contents, schema)
            .with_context(|| format!("Invalid model artifact: {}", path.display()))
    }

    pub fn from_json_str(json: &str, schema: &FeatureSchema) -> Result<Self> {
        let artifact: ModelArtifact = serde_json::from_str(json)
            .with_context(|| "Failed to parse model JSON")?;

        if artifact.trees.is_empty() {
            bail!("No trees found in model artifact");
        }

        let trees = artifact.trees.iter()
            .enumerate()
            .map(|(i, root)| Tree::from_dump(root, schema).with_context(|| format!("tree {}", i)))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!("Loaded tree ensemble: {} trees over {} features", trees.len(), schema.len());

        Ok(Self {
            base_score: artifact.base_score,
            trees,
            n_features: schema.len(),
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

impl YieldScorer for TreeEnsembleModel {
    fn score(&self, features: &FeatureVector) -> std::result::Result<f64, ScorerError> {
        if features.len() != self.n_features {
            return Err(ScorerError::SchemaMismatch {
                expected: self.n_features,
                got: features.len(),
            });
        }

        let x = features.as_slice();
        let total = self.base_score + self.trees.iter().map(|tree| tree.predict(x)).sum::<f64>();

        if !total.is_finite() {
            return Err(ScorerError::NonFinite(total));
        }

        Ok(total)
    }
}
