//! コマンド出力の受け渡し

use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// コマンド出力とビルド進捗の受け取り先
pub trait OutputSink: Send + Sync {
    /// エンジンが出力した1行
    fn line(&self, stream: OutputStream, line: &str);

    /// ビルダー自身の進捗メッセージ
    fn status(&self, message: &str) {
        self.line(OutputStream::Stdout, message);
    }
}

/// ターミナル出力
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub const PREFIX: &'static str = " ----->  ";
}

impl OutputSink for ConsoleSink {
    fn line(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => println!("{}{}", Self::PREFIX.bold(), line.green()),
            OutputStream::Stderr => eprintln!("{}{}", Self::PREFIX.bold(), line.red()),
        }
    }

    fn status(&self, message: &str) {
        println!("{}", message.cyan());
    }
}
