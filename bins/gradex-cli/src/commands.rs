// CLI commands for exercising the grading pipeline against a live
// execution service and sanity-checking question banks before deploy.

use anyhow::{bail, Context, Result};
use gradex_common::types::{Language, Question, QuestionKind};
use gradex_judge::inject::PLACEHOLDER;
use gradex_judge::{JudgeClient, JudgeConfig, Runner};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct Container {
    #[serde(alias = "_id")]
    id: String,
    #[serde(default)]
    questions: Vec<Question>,
}

fn load_bank(path: &Path) -> Result<Vec<Container>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn find_question<'a>(container: &'a Container, question_id: &str) -> Option<&'a Question> {
    container
        .questions
        .iter()
        .enumerate()
        .find(|(index, q)| match &q.id {
            Some(id) => id == question_id,
            None => index.to_string() == question_id,
        })
        .map(|(_, q)| q)
}

pub async fn grade(
    file: &Path,
    language: &str,
    bank: &Path,
    test_id: &str,
    question_id: &str,
) -> Result<()> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let Some(language) = Language::from_name(language) else {
        bail!("unknown language: {language} (expected python, javascript, java, cpp or c)");
    };

    let containers = load_bank(bank)?;
    let container = containers
        .iter()
        .find(|c| c.id == test_id)
        .with_context(|| format!("no container '{test_id}' in {}", bank.display()))?;
    let question = find_question(container, question_id)
        .with_context(|| format!("no question '{question_id}' in container '{test_id}'"))?;

    let config = JudgeConfig::from_env();
    println!("→ Judging {} against '{test_id}/{question_id}'", file.display());
    println!("  Language: {language}");
    println!("  Execution service: {}", config.base_url);
    println!();

    let runner = Runner::new(JudgeClient::new(config.base_url.clone()), config.runner);
    let report = runner.run(&source, language, question).await?;

    for (index, result) in report.results.iter().enumerate() {
        let mark = if result.passed { "✓" } else { "✗" };
        println!("  {mark} Test {} (input: {:?})", index + 1, result.input);
        if !result.passed {
            println!("    Expected: {:?}", result.expected);
            println!("    Got:      {:?}", result.actual);
            if !result.error.is_empty() {
                println!("    Error: {}", result.error.lines().next().unwrap_or(""));
            }
        }
    }

    println!();
    println!(
        "→ Score: {}/100 ({}/{} passed, slowest case {:.3}s)",
        report.score,
        report.passed_count(),
        report.total(),
        report.max_time_secs
    );

    Ok(())
}

pub fn check_bank(bank: &Path) -> Result<()> {
    let containers = load_bank(bank)?;
    let mut problems = Vec::new();

    for container in &containers {
        for (index, question) in container.questions.iter().enumerate() {
            if question.kind != QuestionKind::Code {
                continue;
            }
            let label = question
                .id
                .clone()
                .unwrap_or_else(|| index.to_string());

            if question.test_cases.is_empty() {
                problems.push(format!("{}/{label}: code question has no test cases", container.id));
            }
            for (name, harness) in &question.validation_programs {
                let needs_marker = matches!(
                    Language::from_name(name),
                    Some(Language::Java) | Some(Language::Cpp)
                );
                if needs_marker && !harness.contains(PLACEHOLDER) {
                    problems.push(format!(
                        "{}/{label}: {name} harness is missing the {PLACEHOLDER} marker",
                        container.id
                    ));
                }
                if Language::from_name(name).is_none() {
                    problems.push(format!(
                        "{}/{label}: harness for unknown language '{name}'",
                        container.id
                    ));
                }
            }
        }
    }

    if problems.is_empty() {
        println!("✓ {} looks good ({} containers)", bank.display(), containers.len());
        Ok(())
    } else {
        for problem in &problems {
            println!("✗ {problem}");
        }
        bail!("{} problem(s) found in {}", problems.len(), bank.display());
    }
}
