use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;

use symptom_triage::{
    ClientConfig, Demographics, FlowController, FlowOutcome, HttpDiagnosticClient,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing based on environment variables.
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "symptom_triage=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn read_demographics() -> io::Result<Demographics> {
    let age = prompt("Patient age (blank for default): ")?;
    let weight = prompt("Patient weight in kg (blank for default): ")?;

    let age = age.parse::<u32>().ok();
    let weight = weight.parse::<f64>().ok();
    match (age, weight) {
        (Some(age), Some(weight)) => match Demographics::new(age, weight) {
            Ok(demographics) => Ok(demographics),
            Err(e) => {
                println!("{e}; using defaults");
                Ok(Demographics::default())
            }
        },
        _ => Ok(Demographics::default()),
    }
}

fn present(outcome: &FlowOutcome) {
    match outcome {
        FlowOutcome::QuestionsPending { analysis, .. } => {
            if let Some(analysis) = analysis {
                present_analysis(analysis);
            }
        }
        FlowOutcome::Complete {
            analysis,
            recommendations,
        } => {
            if let Some(analysis) = analysis {
                present_analysis(analysis);
            }
            if recommendations.is_empty() {
                println!(
                    "No specific medicine recommendations available. \
                     Please consult a healthcare professional."
                );
            } else {
                println!("Recommended medicines:");
                for rec in recommendations {
                    println!("  - {} | {} | {}", rec.name, rec.dosage, rec.duration);
                    if let Some(note) = &rec.note {
                        println!("    note: {note}");
                    }
                }
            }
        }
    }
}

fn present_analysis(analysis: &symptom_triage::AnalysisResult) {
    let confidence = (analysis.confidence.clamp(0.0, 1.0) * 100.0).round();
    println!("Analysis confidence: {confidence}%");
    if analysis.possible_diseases.is_empty() {
        println!("No specific conditions identified. Please provide more details.");
    } else {
        println!("Possible conditions (most likely first):");
        for disease in &analysis.possible_diseases {
            println!("  - {disease}");
        }
    }
}

async fn run_interview(controller: &mut FlowController, symptoms: &str) -> anyhow::Result<()> {
    let mut outcome = match controller.submit_symptoms(symptoms).await {
        Ok(outcome) => outcome,
        Err(e) => {
            println!("Operation failed ({}): {e}", e.category());
            if controller.can_retry() && prompt("Retry? [y/N]: ")?.eq_ignore_ascii_case("y") {
                controller.retry().await?
            } else {
                return Ok(());
            }
        }
    };

    while let FlowOutcome::QuestionsPending { questions, .. } = &outcome {
        present(&outcome);
        println!("A few more details are needed:");
        let mut responses = HashMap::new();
        for question in questions {
            let answer = prompt(&format!("  {question} "))?;
            responses.insert(question.clone(), answer);
        }
        let demographics = read_demographics()?;

        outcome = match controller.submit_follow_up(&responses, demographics).await {
            Ok(outcome) => outcome,
            Err(e) => {
                println!("Operation failed ({}): {e}", e.category());
                if controller.can_retry() && prompt("Retry? [y/N]: ")?.eq_ignore_ascii_case("y") {
                    controller.retry().await?
                } else {
                    return Ok(());
                }
            }
        };
    }

    present(&outcome);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::from_env();
    info!(base_url = %config.base_url, "starting symptom triage client");
    let client = Arc::new(HttpDiagnosticClient::new(config)?);
    let mut controller = FlowController::new(client);

    println!("Symptom triage interview. Empty input exits.");
    loop {
        let symptoms = prompt("\nDescribe your symptoms: ")?;
        if symptoms.is_empty() {
            break;
        }
        run_interview(&mut controller, &symptoms).await?;
    }

    Ok(())
}
