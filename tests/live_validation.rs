use std::{env, sync::Once};

use tos_decoder::{
    analysis::{AnalysisService, AnalysisStatus},
    backend::{BackendRequest, get_backend},
    config,
};

static INIT: Once = Once::new();

fn set_default_env(key: &str, value: &str) {
    let needs_value = env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true);
    if needs_value {
        // SAFETY: Tests run serially via Once and we intentionally mutate process env.
        unsafe {
            env::set_var(key, value);
        }
    }
}

fn init_config_once() {
    INIT.call_once(|| {
        set_default_env("BACKEND_PROVIDER", "ollama");
        set_default_env("OLLAMA_URL", "http://127.0.0.1:11434");
        set_default_env("OLLAMA_MODEL", "llama3.1");
        config::init_config();
    });
}

#[tokio::test]
#[ignore = "Requires a live backend"]
async fn live_backend_generates_text() {
    init_config_once();
    let backend = get_backend().expect("backend");
    let text = backend
        .invoke(BackendRequest::new("Reply with the single word: ready", 16))
        .await
        .expect("failed to generate text from provider");
    assert!(!text.trim().is_empty(), "provider returned empty text");
}

#[tokio::test]
#[ignore = "Requires a live backend"]
async fn live_analysis_meets_minimum_risk_count() {
    init_config_once();
    let service = AnalysisService::from_config().expect("service");
    let report = service
        .analyze(
            "By using the service you agree to binding arbitration and waive class actions. \
             We may share your personal data with advertising partners. \
             Subscriptions renew automatically unless cancelled 30 days in advance."
                .to_string(),
        )
        .await
        .expect("analysis");
    if report.status == AnalysisStatus::Complete {
        assert!(report.risks.len() >= service.settings().min_risks);
    }
}
