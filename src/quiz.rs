//! World 3 quiz
//!
//! One answer per question. The fun fact fades in shortly after answering,
//! the next question follows, and the score card is shown before the quiz
//! reports it is finished. All timing is driven by elapsed milliseconds.

use crate::dialog::{INTRO_MS_PER_CHAR, Typewriter};
use crate::tuning::QuizQuestion;

pub const FUN_FACT_DELAY_MS: f64 = 500.0;
pub const NEXT_QUESTION_DELAY_MS: f64 = 2500.0;
pub const SCORE_SCREEN_MS: f64 = 3000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    Asking,
    Answered { selected: usize, correct: bool },
    Score,
    Finished,
}

/// Something the screen must react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizEvent {
    NextQuestion(usize),
    ShowScore,
    Finished,
}

/// Styling of an answer button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    Open,
    Disabled,
    Correct,
    Wrong,
}

/// Progress dot above the card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dot {
    Pending,
    Active,
    Completed,
    Wrong,
}

/// The host character's reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Neutral,
    Happy,
    Comfort,
}

/// 3 stars for a perfect score, 2 for at least 60%, else 1
pub fn stars(score: usize, total: usize) -> u8 {
    if score >= total {
        3
    } else if score as f64 >= total as f64 * 0.6 {
        2
    } else {
        1
    }
}

pub struct Quiz {
    questions: Vec<QuizQuestion>,
    index: usize,
    score: usize,
    /// Per answered question: was it right
    results: Vec<bool>,
    phase: QuizPhase,
    /// Time spent in the current phase
    phase_ms: f64,
    prompt: Typewriter,
}

impl Quiz {
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        let prompt = Typewriter::new(questions.first().map_or("", |q| q.question.as_str()), INTRO_MS_PER_CHAR);
        let phase = if questions.is_empty() {
            QuizPhase::Score
        } else {
            QuizPhase::Asking
        };
        Self {
            questions,
            index: 0,
            score: 0,
            results: Vec::new(),
            phase,
            phase_ms: 0.0,
            prompt,
        }
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Index of the question on screen
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.index)
    }

    /// Question text as typed so far
    pub fn prompt(&self) -> &str {
        self.prompt.visible()
    }

    /// Pick an answer. Returns whether it was right, or `None` if the click
    /// doesn't count (already answered, out of range, not asking).
    pub fn answer(&mut self, selected: usize) -> Option<bool> {
        if self.phase != QuizPhase::Asking {
            return None;
        }
        let q = self.questions.get(self.index)?;
        if selected >= q.options.len() {
            return None;
        }
        let correct = q.correct.is_none_or(|c| c == selected);
        if correct {
            self.score += 1;
        }
        self.results.push(correct);
        self.phase = QuizPhase::Answered { selected, correct };
        self.phase_ms = 0.0;
        log::debug!("Quiz {}: answer {selected} correct={correct}", self.index);
        Some(correct)
    }

    pub fn update(&mut self, dt_ms: f64) -> Option<QuizEvent> {
        self.phase_ms += dt_ms.max(0.0);
        match self.phase {
            QuizPhase::Asking => {
                self.prompt.advance(dt_ms);
                None
            }
            QuizPhase::Answered { .. } if self.phase_ms >= NEXT_QUESTION_DELAY_MS => {
                self.phase_ms = 0.0;
                self.index += 1;
                match self.questions.get(self.index) {
                    Some(q) => {
                        self.prompt = Typewriter::new(&q.question, INTRO_MS_PER_CHAR);
                        self.phase = QuizPhase::Asking;
                        Some(QuizEvent::NextQuestion(self.index))
                    }
                    None => {
                        self.phase = QuizPhase::Score;
                        log::info!("Quiz done: {}/{}", self.score, self.total());
                        Some(QuizEvent::ShowScore)
                    }
                }
            }
            QuizPhase::Score if self.phase_ms >= SCORE_SCREEN_MS => {
                self.phase = QuizPhase::Finished;
                Some(QuizEvent::Finished)
            }
            _ => None,
        }
    }

    pub fn fun_fact_visible(&self) -> bool {
        matches!(self.phase, QuizPhase::Answered { .. }) && self.phase_ms >= FUN_FACT_DELAY_MS
    }

    pub fn option_marks(&self) -> Vec<OptionMark> {
        let Some(q) = self.question() else {
            return Vec::new();
        };
        let QuizPhase::Answered { selected, correct } = self.phase else {
            return vec![OptionMark::Open; q.options.len()];
        };
        (0..q.options.len())
            .map(|i| match q.correct {
                None => OptionMark::Correct,
                Some(c) if c == i => OptionMark::Correct,
                _ if i == selected && !correct => OptionMark::Wrong,
                _ => OptionMark::Disabled,
            })
            .collect()
    }

    pub fn dots(&self) -> Vec<Dot> {
        (0..self.questions.len())
            .map(|i| match self.results.get(i) {
                Some(true) => Dot::Completed,
                Some(false) => Dot::Wrong,
                None if i == self.index => Dot::Active,
                None => Dot::Pending,
            })
            .collect()
    }

    pub fn mood(&self) -> Mood {
        match self.phase {
            QuizPhase::Answered { correct: true, .. } => Mood::Happy,
            QuizPhase::Answered { correct: false, .. } => Mood::Comfort,
            _ => Mood::Neutral,
        }
    }

    pub fn score_text(&self) -> String {
        format!("You got {}/{} correct!", self.score, self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions() -> Vec<QuizQuestion> {
        let q = |correct| QuizQuestion {
            question: "Which?".into(),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct,
            fun_fact: "fact".into(),
        };
        vec![q(Some(1)), q(None)]
    }

    #[test]
    fn test_stars() {
        assert_eq!(stars(5, 5), 3);
        assert_eq!(stars(3, 5), 2);
        assert_eq!(stars(2, 5), 1);
        assert_eq!(stars(0, 0), 3);
    }

    #[test]
    fn test_one_answer_per_question() {
        let mut quiz = Quiz::new(questions());
        assert_eq!(quiz.answer(7), None);
        assert_eq!(quiz.answer(0), Some(false));
        assert_eq!(quiz.answer(1), None);
        assert_eq!(quiz.score(), 0);
        assert_eq!(
            quiz.option_marks(),
            vec![OptionMark::Wrong, OptionMark::Correct, OptionMark::Disabled]
        );
        assert_eq!(quiz.mood(), Mood::Comfort);
        assert_eq!(quiz.dots(), vec![Dot::Wrong, Dot::Pending]);
    }

    #[test]
    fn test_full_run_timing() {
        let mut quiz = Quiz::new(questions());
        assert_eq!(quiz.answer(1), Some(true));
        assert!(!quiz.fun_fact_visible());
        assert_eq!(quiz.update(500.0), None);
        assert!(quiz.fun_fact_visible());
        assert_eq!(quiz.update(2000.0), Some(QuizEvent::NextQuestion(1)));
        assert_eq!(quiz.dots(), vec![Dot::Completed, Dot::Active]);

        // Every answer counts on the second question
        assert_eq!(quiz.answer(2), Some(true));
        assert_eq!(quiz.option_marks(), vec![OptionMark::Correct; 3]);
        assert_eq!(quiz.update(2500.0), Some(QuizEvent::ShowScore));
        assert_eq!(quiz.score_text(), "You got 2/2 correct!");
        assert_eq!(quiz.update(2999.0), None);
        assert_eq!(quiz.update(1.0), Some(QuizEvent::Finished));
        assert_eq!(quiz.phase(), QuizPhase::Finished);
        assert_eq!(quiz.update(5000.0), None);
    }

    #[test]
    fn test_prompt_types_out() {
        let mut quiz = Quiz::new(questions());
        assert_eq!(quiz.prompt(), "W");
        quiz.update(60.0);
        assert_eq!(quiz.prompt(), "Whi");
    }
}
