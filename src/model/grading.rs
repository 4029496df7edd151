//! Static scoring of exercise submissions.
//!
//! Nothing is executed: the score is built from a handful of textual checks
//! so that learners get immediate, deterministic feedback.

use serde::{Deserialize, Serialize};

const BASE_SCORE: f64 = 60.0;
// reported weight of the submission check; the base score itself is fixed
const SUBMITTED_POINTS: i32 = 10;
const MAX_SCORE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TestResult {
    pub test: String,
    pub passed: bool,
    pub points: i32,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct Grade {
    pub score: f64,
    pub points_earned: i32,
    pub test_results: Vec<TestResult>,
    pub feedback: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubmissionLanguage {
    Python,
    JavaScript,
    Other,
}

impl From<&str> for SubmissionLanguage {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "python" | "py" => Self::Python,
            "javascript" | "js" | "typescript" | "ts" => Self::JavaScript,
            _ => Self::Other,
        }
    }
}

struct Scorer {
    score: f64,
    results: Vec<TestResult>,
}

impl Scorer {
    fn check(&mut self, test: &str, passed: bool, points: i32) {
        if passed {
            self.score += f64::from(points);
            self.record(test, points);
        }
    }

    fn record(&mut self, test: &str, points: i32) {
        self.results.push(TestResult {
            test: test.to_string(),
            passed: true,
            points,
        });
    }
}

pub fn grade_submission(code: &str, language: &str) -> Grade {
    if code.trim().is_empty() {
        let results = vec![TestResult {
            test: String::from("Code submitted"),
            passed: false,
            points: 0,
        }];
        return Grade {
            score: 0.0,
            points_earned: 0,
            feedback: feedback_for(0.0),
            test_results: results,
        };
    }

    let mut scorer = Scorer {
        score: BASE_SCORE,
        results: Vec::new(),
    };
    scorer.record("Code submitted", SUBMITTED_POINTS);

    match SubmissionLanguage::from(language) {
        SubmissionLanguage::Python => {
            scorer.check("Function definition found", code.contains("def "), 15);
            scorer.check("Return statement found", code.contains("return "), 10);
            scorer.check("Import statement found", code.contains("import "), 5);
        }
        SubmissionLanguage::JavaScript => {
            scorer.check(
                "Function definition found",
                code.contains("function ") || code.contains("=>"),
                15,
            );
            scorer.check("Return statement found", code.contains("return "), 10);
        }
        SubmissionLanguage::Other => {}
    }

    scorer.check("Multiple lines of code", code.split('\n').count() > 3, 5);
    scorer.check(
        "Output statement found",
        code.contains("print(") || code.contains("console.log("),
        5,
    );

    let score = scorer.score.min(MAX_SCORE);
    Grade {
        score,
        points_earned: (score / 10.0).floor() as i32,
        feedback: feedback_for(score),
        test_results: scorer.results,
    }
}

fn feedback_for(score: f64) -> String {
    let text = if score >= 90.0 {
        "Excellent work! Your code demonstrates strong understanding of the concepts."
    } else if score >= 80.0 {
        "Great job! Your solution is well-structured and functional."
    } else if score >= 70.0 {
        "Good effort! Your code works but could be improved with better structure."
    } else if score >= 60.0 {
        "Not bad! You have the basic idea but need to refine your implementation."
    } else {
        "Keep practicing! Review the concepts and try again."
    };
    text.to_string()
}
