//! User-facing status messages: success/error banners and a read-only text area.

pub trait StatusBoard {
    fn success(&mut self, message: &str);
    fn error(&mut self, message: &str);
    fn text_area(&mut self, label: &str, value: &str);
}

/// コンソールにバナーを表示する
#[derive(Debug, Default)]
pub struct ConsoleStatus;

impl StatusBoard for ConsoleStatus {
    fn success(&mut self, message: &str) {
        log::info!("{message}");
        println!("✔ {message}");
    }

    fn error(&mut self, message: &str) {
        log::error!("{message}");
        eprintln!("✖ {message}");
    }

    fn text_area(&mut self, label: &str, value: &str) {
        let width = value
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
            .max(label.chars().count())
            + 2;
        let rule = "─".repeat(width);
        println!("┌{rule}┐");
        println!("│ {label:<w$} │", w = width - 2);
        println!("├{rule}┤");
        for line in value.lines() {
            println!("│ {line:<w$} │", w = width - 2);
        }
        println!("└{rule}┘");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEntry {
    Success(String),
    Error(String),
    TextArea { label: String, value: String },
}

/// 表示内容をメモリに残すだけの StatusBoard（テスト・ヘッドレス実行用）
#[derive(Debug, Default)]
pub struct RecordingStatus {
    pub entries: Vec<StatusEntry>,
}

impl RecordingStatus {
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match e {
            StatusEntry::Error(m) => Some(m.as_str()),
            _ => None,
        })
    }

    pub fn text_areas(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|e| match e {
            StatusEntry::TextArea { label, value } => Some((label.as_str(), value.as_str())),
            _ => None,
        })
    }
}

impl StatusBoard for RecordingStatus {
    fn success(&mut self, message: &str) {
        self.entries.push(StatusEntry::Success(message.to_string()));
    }

    fn error(&mut self, message: &str) {
        self.entries.push(StatusEntry::Error(message.to_string()));
    }

    fn text_area(&mut self, label: &str, value: &str) {
        self.entries.push(StatusEntry::TextArea {
            label: label.to_string(),
            value: value.to_string(),
        });
    }
}
