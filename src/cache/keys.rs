//! Cache Keys Module
//!
//! Key families, their namespaced key shapes and default TTLs. Key
//! construction is pure: the same identifiers always give the same key.

use serde::{Deserialize, Serialize};

/// Placeholder for an unset chapter or topic in a question-list key.
pub const ANY_SEGMENT: &str = "all";

// == Key Family ==
/// A class of cached domain object sharing a key prefix and TTL policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    Limits,
    Profile,
    Subscription,
    QuestionList,
    Question,
    Analytics,
    Chapters,
    Topics,
}

impl KeyFamily {
    /// Every family, in declaration order.
    pub const ALL: [KeyFamily; 8] = [
        KeyFamily::Limits,
        KeyFamily::Profile,
        KeyFamily::Subscription,
        KeyFamily::QuestionList,
        KeyFamily::Question,
        KeyFamily::Analytics,
        KeyFamily::Chapters,
        KeyFamily::Topics,
    ];

    /// Families keyed by user id and dropped together on account events.
    pub const PER_USER: [KeyFamily; 4] = [
        KeyFamily::Limits,
        KeyFamily::Profile,
        KeyFamily::Subscription,
        KeyFamily::Analytics,
    ];

    /// Key prefix, without the trailing delimiter.
    pub fn prefix(self) -> &'static str {
        match self {
            KeyFamily::Limits => "limits",
            KeyFamily::Profile => "profile",
            KeyFamily::Subscription => "subscription",
            KeyFamily::QuestionList => "questions:list",
            KeyFamily::Question => "question:full",
            KeyFamily::Analytics => "analytics",
            KeyFamily::Chapters => "chapters",
            KeyFamily::Topics => "topics",
        }
    }

    /// Default time-to-live in seconds.
    pub fn default_ttl(self) -> u64 {
        match self {
            KeyFamily::Limits | KeyFamily::Subscription => 3600,
            KeyFamily::Profile => 1800,
            KeyFamily::Analytics => 300,
            KeyFamily::QuestionList
            | KeyFamily::Question
            | KeyFamily::Chapters
            | KeyFamily::Topics => 7200,
        }
    }

    /// Joins the family prefix and identifier segments with `:`.
    pub fn key(self, segments: &[&str]) -> String {
        let mut key = String::from(self.prefix());
        for segment in segments {
            key.push(':');
            key.push_str(segment);
        }
        key
    }
}

// == Per-family Key Builders ==
pub fn limits_key(user_id: &str) -> String {
    KeyFamily::Limits.key(&[user_id])
}

pub fn profile_key(user_id: &str) -> String {
    KeyFamily::Profile.key(&[user_id])
}

pub fn subscription_key(user_id: &str) -> String {
    KeyFamily::Subscription.key(&[user_id])
}

pub fn question_key(question_id: &str) -> String {
    KeyFamily::Question.key(&[question_id])
}

pub fn analytics_key(user_id: &str) -> String {
    KeyFamily::Analytics.key(&[user_id])
}

pub fn chapters_key(exam_type: &str, subject: &str) -> String {
    KeyFamily::Chapters.key(&[exam_type, subject])
}

pub fn topics_key(exam_type: &str, subject: &str, chapter: &str) -> String {
    KeyFamily::Topics.key(&[exam_type, subject, chapter])
}

/// Every per-user key for `user_id`.
pub fn user_keys(user_id: &str) -> Vec<String> {
    KeyFamily::PER_USER
        .iter()
        .map(|family| family.key(&[user_id]))
        .collect()
}

// == Question List Query ==
/// Filter and page identifying one cached page of a question bank listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionListQuery {
    pub exam_type: String,
    pub subject: String,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default = "first_page")]
    pub page: u32,
}

fn first_page() -> u32 {
    1
}

impl QuestionListQuery {
    pub fn new(exam_type: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            exam_type: exam_type.into(),
            subject: subject.into(),
            chapter: None,
            topic: None,
            page: first_page(),
        }
    }

    pub fn chapter(mut self, chapter: impl Into<String>) -> Self {
        self.chapter = Some(chapter.into());
        self
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// `questions:list:{examType}:{subject}:{chapter}:{topic}:{page}`
    pub fn cache_key(&self) -> String {
        let page = self.page.to_string();
        KeyFamily::QuestionList.key(&[
            self.exam_type.as_str(),
            self.subject.as_str(),
            self.chapter.as_deref().unwrap_or(ANY_SEGMENT),
            self.topic.as_deref().unwrap_or(ANY_SEGMENT),
            page.as_str(),
        ])
    }
}
