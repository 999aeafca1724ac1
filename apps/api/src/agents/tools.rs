//! Heuristic career tools: skill detection, naive job matching, and the
//! canned learning path used when no LLM provider is reachable.

use std::collections::BTreeSet;

use crate::models::JobPost;

const SKILLS_DB: &[&str] = &[
    "python",
    "java",
    "c++",
    "sql",
    "mongodb",
    "mysql",
    "react",
    "node",
    "express",
    "aws",
    "docker",
    "kubernetes",
    "git",
    "rest",
    "linux",
    "pandas",
    "numpy",
    "tensorflow",
    "pytorch",
    "rust",
];

#[derive(Debug)]
pub struct ResumeAnalysis {
    pub skills: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug)]
pub struct RankedJob {
    pub post: JobPost,
    pub match_score: usize,
}

/// Splits on anything that is not alphanumeric, `+` or `#`, so tokens like
/// `c++` survive and `java` does not match inside `javascript`.
fn tokens(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

pub fn analyze_resume(text: &str) -> ResumeAnalysis {
    let found = tokens(text);
    let skills: Vec<String> = SKILLS_DB
        .iter()
        .filter(|s| found.contains(**s))
        .map(|s| s.to_string())
        .collect();

    let mut suggestions = Vec::new();
    let has = |s: &str| skills.iter().any(|k| k == s);
    if !has("sql") {
        suggestions
            .push("Add SQL with a concrete bullet (e.g., optimized 5 complex joins)".to_string());
    }
    if !has("aws") {
        suggestions.push("Mention basic cloud skills (AWS/GCP/Azure) if relevant".to_string());
    }
    if !has("react") && !has("node") {
        suggestions
            .push("If applying for full-stack, include React/Node exposure".to_string());
    }

    ResumeAnalysis {
        skills,
        suggestions,
    }
}

/// Ranks job posts by overlap between detected skills and requirements.
pub fn match_jobs(skills: &[String], job_posts: &[JobPost]) -> Vec<RankedJob> {
    let skills: BTreeSet<&str> = skills.iter().map(String::as_str).collect();
    let mut ranked: Vec<RankedJob> = job_posts
        .iter()
        .map(|post| {
            let match_score = post
                .requirements
                .iter()
                .filter(|r| skills.contains(r.to_lowercase().as_str()))
                .count();
            RankedJob {
                post: post.clone(),
                match_score,
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    ranked
}

/// Five-day plan returned by the learning agent when the provider chain has
/// no configured providers.
pub fn learning_path(topic: &str) -> String {
    let base = title_case(topic.trim());
    [
        format!("{base}: Day 1 - Core concepts and hello world"),
        format!("{base}: Day 2 - Practice problems and a mini project"),
        format!("{base}: Day 3 - Build a tiny app and write a README"),
        format!("{base}: Day 4 - Add tests and refactor"),
        format!("{base}: Day 5 - Ship a demo and share it"),
    ]
    .join("\n")
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
