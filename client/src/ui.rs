//! Minimal stdin/stdout UI: a background thread reads lines and forwards
//! them over a channel so the async session loop can `tokio::select!`
//! between socket reads and user input without blocking either.

use tokio::sync::mpsc::UnboundedReceiver;

/// A line the user typed, forwarded to the session loop. `None` on the
/// channel (stdin closed) is not sent; the sender side just stops.
pub fn spawn_stdin_reader() -> UnboundedReceiver<String> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();

        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(line.trim_end().to_string()).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    rx
}

/// Renders the current participant list the way the original's
/// `DisplayParticipants` does: a numbered list the user picks a recipient
/// from.
pub fn display_participants(participants: &[String]) {
    if participants.is_empty() {
        println!("(no one else has published a key yet)");
        return;
    }

    println!("participants:");
    for (i, name) in participants.iter().enumerate() {
        println!("  {}) {name}", i + 1);
    }
}

pub fn print_help() {
    println!("commands: /list, /to <name>, /quit — anything else is sent to the current recipient");
}
