#![allow(dead_code)]

use axum::Router;
use trackrisk_rs::scoring::bundle::ModelBundle;

pub const BUNDLE: &str = r#"{
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
            }
        ]
    },
    "evacuation_model": {
        "kind": "linear",
        "intercept": 0.5,
        "coefficients": [0.0, 0.0, 0.1, 0.2]
    }
}"#;

pub fn bundle() -> ModelBundle {
    ModelBundle::from_json(BUNDLE).expect("bundle")
}

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn_mock(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock");
    let addr = listener.local_addr().expect("mock addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });
    format!("http://{}", addr)
}
