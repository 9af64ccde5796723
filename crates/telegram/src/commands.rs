//! Slash command parsing.

use teloxide::types::BotCommand;

/// A recognised slash command and its argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Status,
    Hello,
    /// Topic, empty when omitted.
    Create(String),
    Modify(String),
    Search(String),
    Radar,
    /// Slash command we don't handle.
    Unknown(String),
}

impl Command {
    /// Label used for logs and metrics.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Status => "status",
            Self::Hello => "hello",
            Self::Create(_) => "create",
            Self::Modify(_) => "modify",
            Self::Search(_) => "search",
            Self::Radar => "radar",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Parse `text` as a slash command.
///
/// Returns `None` for plain text and for commands addressed to a different
/// bot (`/help@other_bot`). The `@bot` suffix is matched case-insensitively.
#[must_use]
pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let text = text.trim_start();
    let body = text.strip_prefix('/')?;
    let (head, args) = match body.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (body, ""),
    };
    let name = match head.split_once('@') {
        Some((name, target)) => {
            let ours = bot_username.is_some_and(|me| me.eq_ignore_ascii_case(target));
            if !ours {
                return None;
            }
            name
        },
        None => head,
    };
    if name.is_empty() {
        return None;
    }

    let args = args.to_string();
    Some(match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "status" => Command::Status,
        "hello" => Command::Hello,
        "create" => Command::Create(args),
        "modify" => Command::Modify(args),
        "search" => Command::Search(args),
        "radar" => Command::Radar,
        other => Command::Unknown(other.to_string()),
    })
}

/// Commands registered for client autocomplete.
#[must_use]
pub fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "启动系统"),
        BotCommand::new("status", "查看各层状态"),
        BotCommand::new("hello", "测试AI对话"),
        BotCommand::new("create", "生成内容 [主题]"),
        BotCommand::new("modify", "修改上一次生成的内容"),
        BotCommand::new("search", "网络搜索"),
        BotCommand::new("radar", "启动信息雷达"),
        BotCommand::new("help", "显示帮助"),
    ]
}
