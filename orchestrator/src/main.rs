use orchestrator::payload::read_image;
use orchestrator::{InferenceOrchestrator, OrchestrationState, OrchestratorConfig, Snapshot};
use std::env;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let Some(image_path) = env::args().nth(1) else {
        eprintln!("usage: tumor-report <image-file>");
        return ExitCode::from(2);
    };

    let config = match OrchestratorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            return ExitCode::from(2);
        }
    };

    let image = match read_image(&image_path) {
        Ok(image) => image,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::from(2);
        }
    };

    let orchestrator = match InferenceOrchestrator::from_config(&config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            log::error!("Failed to set up services: {}", e);
            return ExitCode::from(2);
        }
    };

    log::info!("Classifier endpoint: {}", config.classifier_url);

    let mut transitions = orchestrator.transitions();
    let progress = tokio::spawn(async move {
        while let Ok(transition) = transitions.recv().await {
            log::info!("Submission {}: {}", transition.submission, transition.state);
        }
    });

    orchestrator.submit(image).await;
    let snapshot = orchestrator.snapshot();

    drop(orchestrator);
    let _ = progress.await;

    render(&snapshot).into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Failure => ExitCode::FAILURE,
        }
    }
}

fn render(snapshot: &Snapshot) -> Outcome {
    match &snapshot.state {
        OrchestrationState::Complete => {
            if let Some(classification) = &snapshot.classification {
                println!("Result: {}", classification.display_label());
            }
            match (&snapshot.report, &snapshot.warning) {
                (Some(report), _) => println!("\n{}", report),
                (None, Some(warning)) => eprintln!("Report unavailable: {}", warning),
                (None, None) => {}
            }
            Outcome::Success
        }
        OrchestrationState::Failed(failure) => {
            eprintln!("Error: could not predict ({})", failure);
            Outcome::Failure
        }
        other => {
            log::error!("Submission ended in unexpected state: {}", other);
            Outcome::Failure
        }
    }
}
