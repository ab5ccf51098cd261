//! Fitted label encoders and regressors exported from the training notebook.
//!
//! The bundle is a JSON document:
//!
//! ```json
//! {
//!   "le_weather": { "classes": ["clearSky", "overcast"] },
//!   "le_terrain": { "classes": ["Горы", "Равнина"] },
//!   "risk_model": { "kind": "forest", "trees": [ ... ] },
//!   "evacuation_model": { "kind": "linear", "intercept": 0.1, "coefficients": [0, 0, 0, 0] }
//! }
//! ```
//!
//! Trees use the flattened node arrays of a fitted decision tree: a node is a leaf
//! when its left child is `-1`, otherwise samples with `x[feature] <= threshold`
//! go left. Feature order is `[temperature, elevation, weather_encoded, terrain_encoded]`.

use std::path::Path;

use serde::Deserialize;

use crate::error::{ModelError, ScoringError};

pub const FEATURE_COUNT: usize = 4;

#[derive(Debug, Clone, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn transform(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|class| class == label)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<f64>,
}

impl Tree {
    fn validate(&self) -> Result<(), ModelError> {
        let n = self.value.len();
        if n == 0 {
            return Err(ModelError::Invalid("tree has no nodes".to_string()));
        }
        if [
            self.children_left.len(),
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
        ]
        .iter()
        .any(|len| *len != n)
        {
            return Err(ModelError::Invalid(
                "tree node arrays differ in length".to_string(),
            ));
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left < 0 && right < 0 {
                continue;
            }
            // children always come after their parent, so traversal terminates
            let in_range = |child: i64| child > node as i64 && (child as usize) < n;
            if !in_range(left) || !in_range(right) {
                return Err(ModelError::Invalid(format!(
                    "node {node} has invalid children ({left}, {right})"
                )));
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= FEATURE_COUNT {
                return Err(ModelError::Invalid(format!(
                    "node {node} splits on unknown feature {feature}"
                )));
            }
        }
        Ok(())
    }

    fn predict(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        let mut node = 0;
        loop {
            let left = self.children_left[node];
            if left < 0 {
                return self.value[node];
            }
            let feature = self.feature[node] as usize;
            node = if x[feature] <= self.threshold[node] {
                left as usize
            } else {
                self.children_right[node] as usize
            };
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    Linear {
        intercept: f64,
        coefficients: Vec<f64>,
    },
    /// Mean of independently fitted trees.
    Forest { trees: Vec<Tree> },
    GradientBoosting {
        init: f64,
        learning_rate: f64,
        trees: Vec<Tree>,
    },
}

impl Regressor {
    fn validate(&self) -> Result<(), ModelError> {
        match self {
            Regressor::Linear { coefficients, .. } => {
                if coefficients.len() != FEATURE_COUNT {
                    return Err(ModelError::Invalid(format!(
                        "linear model expects {FEATURE_COUNT} coefficients, got {}",
                        coefficients.len()
                    )));
                }
                Ok(())
            }
            Regressor::Forest { trees } => {
                if trees.is_empty() {
                    return Err(ModelError::Invalid("forest has no trees".to_string()));
                }
                trees.iter().try_for_each(Tree::validate)
            }
            Regressor::GradientBoosting { trees, .. } => trees.iter().try_for_each(Tree::validate),
        }
    }

    pub fn predict(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        match self {
            Regressor::Linear {
                intercept,
                coefficients,
            } => intercept + coefficients.iter().zip(x).map(|(c, v)| c * v).sum::<f64>(),
            Regressor::Forest { trees } => {
                trees.iter().map(|tree| tree.predict(x)).sum::<f64>() / trees.len() as f64
            }
            Regressor::GradientBoosting {
                init,
                learning_rate,
                trees,
            } => init + learning_rate * trees.iter().map(|tree| tree.predict(x)).sum::<f64>(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub risk: f64,
    pub evacuation: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelBundle {
    le_weather: LabelEncoder,
    le_terrain: LabelEncoder,
    risk_model: Regressor,
    evacuation_model: Regressor,
}

impl ModelBundle {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        let bundle: ModelBundle = serde_json::from_str(text)?;
        bundle.risk_model.validate()?;
        bundle.evacuation_model.validate()?;
        Ok(bundle)
    }

    pub fn weather_encoder(&self) -> &LabelEncoder {
        &self.le_weather
    }

    pub fn terrain_encoder(&self) -> &LabelEncoder {
        &self.le_terrain
    }

    pub fn predict(
        &self,
        temperature: f64,
        elevation: f64,
        weather: &str,
        terrain: &str,
    ) -> Result<Prediction, ScoringError> {
        let weather_encoded =
            self.le_weather
                .transform(weather)
                .ok_or_else(|| ScoringError::UnknownCategory {
                    field: "weather",
                    label: weather.to_string(),
                })?;
        let terrain_encoded =
            self.le_terrain
                .transform(terrain)
                .ok_or_else(|| ScoringError::UnknownCategory {
                    field: "terrain",
                    label: terrain.to_string(),
                })?;

        let features = [
            temperature,
            elevation,
            weather_encoded as f64,
            terrain_encoded as f64,
        ];

        Ok(Prediction {
            risk: self.risk_model.predict(&features),
            evacuation: self.evacuation_model.predict(&features),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = r#"{
        "le_weather": {"classes": ["clearSky", "fog =", "heavyRain"]},
        "le_terrain": {"classes": ["Горы", "Равнина", "Холмы"]},
        "risk_model": {
            "kind": "forest",
            "trees": [
                {
                    "children_left": [1, -1, -1],
                    "children_right": [2, -1, -1],
                    "feature": [1, -2, -2],
                    "threshold": [1500.0, -2.0, -2.0],
                    "value": [0.0, 0.2, 0.8]
                },
                {
                    "children_left": [1, -1, -1],
                    "children_right": [2, -1, -1],
                    "feature": [2, -2, -2],
                    "threshold": [1.5, -2.0, -2.0],
                    "value": [0.0, 0.1, 0.9]
                }
            ]
        },
        "evacuation_model": {
            "kind": "linear",
            "intercept": 0.5,
            "coefficients": [0.01, 0.001, 0.1, 0.2]
        }
    }"#;

    #[test]
    fn encoders_follow_class_order() {
        let bundle = ModelBundle::from_json(BUNDLE).unwrap();
        assert_eq!(bundle.weather_encoder().transform("heavyRain"), Some(2));
        assert_eq!(bundle.terrain_encoder().transform("Горы"), Some(0));
        assert_eq!(bundle.terrain_encoder().transform("Болото"), None);
    }

    #[test]
    fn predicts_from_both_models() {
        let bundle = ModelBundle::from_json(BUNDLE).unwrap();
        let prediction = bundle.predict(10.0, 2000.0, "heavyRain", "Холмы").unwrap();
        // trees: elevation > 1500 -> 0.8, weather 2 > 1.5 -> 0.9
        assert!((prediction.risk - 0.85).abs() < 1e-9);
        // 0.5 + 0.1 + 2.0 + 0.2 + 0.4
        assert!((prediction.evacuation - 3.2).abs() < 1e-9);

        let low = bundle.predict(10.0, 300.0, "clearSky", "Равнина").unwrap();
        assert!((low.risk - 0.15).abs() < 1e-9);
    }

    #[test]
    fn unseen_labels_are_declared_errors() {
        let bundle = ModelBundle::from_json(BUNDLE).unwrap();
        assert!(matches!(
            bundle.predict(10.0, 300.0, "clearSky", "Болото"),
            Err(ScoringError::UnknownCategory { field: "terrain", .. })
        ));
        assert!(matches!(
            bundle.predict(10.0, 300.0, "Clear sky", "Горы"),
            Err(ScoringError::UnknownCategory { field: "weather", .. })
        ));
    }

    #[test]
    fn gradient_boosting_adds_scaled_trees() {
        let regressor: Regressor = serde_json::from_str(
            r#"{"kind":"gradient_boosting","init":1.0,"learning_rate":0.5,"trees":[
                {"children_left":[-1],"children_right":[-1],"feature":[-2],"threshold":[-2.0],"value":[4.0]}
            ]}"#,
        )
        .unwrap();
        regressor.validate().unwrap();
        assert_eq!(regressor.predict(&[0.0; FEATURE_COUNT]), 3.0);
    }

    #[test]
    fn malformed_trees_are_rejected_at_load() {
        let cyclic = BUNDLE.replacen("\"children_left\": [1, -1, -1]", "\"children_left\": [0, -1, -1]", 1);
        assert!(matches!(
            ModelBundle::from_json(&cyclic),
            Err(ModelError::Invalid(_))
        ));

        let bad_feature = BUNDLE.replacen("\"feature\": [1, -2, -2]", "\"feature\": [7, -2, -2]", 1);
        assert!(matches!(
            ModelBundle::from_json(&bad_feature),
            Err(ModelError::Invalid(_))
        ));

        let short_linear = BUNDLE.replace("[0.01, 0.001, 0.1, 0.2]", "[0.01]");
        assert!(ModelBundle::from_json(&short_linear).is_err());
    }
}
