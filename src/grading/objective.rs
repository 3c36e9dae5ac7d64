// src/grading/objective.rs

use crate::config::MAX_SCORE;

/// Multiple-choice check. Total over all integers: an out-of-range selection
/// simply never equals a valid answer key.
pub fn is_correct(selected_index: i64, correct_index: i64) -> bool {
    selected_index == correct_index
}

/// Full marks for a correct answer, nothing otherwise.
pub fn score(correct: bool) -> i32 {
    if correct { MAX_SCORE as i32 } else { 0 }
}
