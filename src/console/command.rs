//! Console line parsing and fixed menu text.

/// Prefix for top-level navigation commands.
pub const COMMAND_SENTINEL: char = '/';

/// Top-level navigation commands, recognized in and out of menu mode.
/// Case-sensitive, exact match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `/wifi` - enter menu mode and show the menu.
    OpenMenu,
    /// `/exit` - leave menu mode.
    ExitMenu,
    /// `/back` - re-show the menu without leaving.
    Back,
    /// `/help` - list commands, mode-independent.
    Help,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line {
            "/wifi" => Some(Self::OpenMenu),
            "/exit" => Some(Self::ExitMenu),
            "/back" => Some(Self::Back),
            "/help" => Some(Self::Help),
            _ => None,
        }
    }
}

/// Parse a numeric selection. `None` for anything that is not an integer.
pub fn parse_choice(line: &str) -> Option<i64> {
    line.trim().parse().ok()
}

pub const MENU_TEXT: &str = "\n\n===== Main Menu =====\n\
Type \"/help\" for more commands\n\
1. Connect to WiFi\n\
2. Scan for WiFi networks\n\
3. Show WiFi/ESP32 info\n\
4. Disconnect from WiFi\n\
5. Change WiFi mode\n\
6. Turn off WiFi\n\
7. Turn on WiFi\n\
8. Clear WiFi Preferences\n\
9. Change Baud Rate\n\
Enter your choice: ";

pub const HELP_TEXT: &str = "\nAvailable Commands:\n\
/wifi - Open WiFi manager\n\
/exit - Exit WiFi manager\n\
/back - Return to previous menu\n\
/help - Show available commands\n";

pub const MODE_MENU_TEXT: &str = "\nChange WiFi mode:\n\
1. Station Mode (STA)\n\
2. Access Point Mode (AP)\n\
3. Station + Access Point Mode (APSTA)\n\
Enter your choice: ";
