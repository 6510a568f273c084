//! Client-perceived transcript model.
//!
//! The presentation layer renders from this structure while a turn is in
//! flight: the user bubble appears optimistically, the reply accumulates in a
//! single trailing bubble as chunks arrive, and the terminal event (success
//! or failure) clears the streaming indicator. Chunks carry no word or
//! sentence alignment; they are appended verbatim.

use uuid::Uuid;

/// One rendered bubble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub content: String,
    pub is_bot: bool,
    pub streaming: bool,
}

#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Optimistic user bubble, keyed by a locally generated id.
    pub fn push_user(&mut self, content: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.push(TranscriptEntry {
            id,
            content: content.into(),
            is_bot: false,
            streaming: false,
        });
        id
    }

    /// Empty bot bubble that subsequent chunks grow into.
    pub fn begin_reply(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.push(TranscriptEntry {
            id,
            content: String::new(),
            is_bot: true,
            streaming: true,
        });
        id
    }

    /// Append a chunk to the trailing streaming bot bubble. Chunks arriving
    /// with no such bubble (stale callbacks after a terminal event) are
    /// dropped.
    pub fn append_chunk(&mut self, chunk: &str) {
        if let Some(last) = self.entries.last_mut() {
            if last.is_bot && last.streaming {
                last.content.push_str(chunk);
            }
        }
    }

    /// Terminal event for a successful turn: the bubble stays, the
    /// streaming indicator clears.
    pub fn settle(&mut self) {
        self.clear_streaming();
    }

    /// Terminal event for a failed turn. The optimistic bubbles remain;
    /// the user must resend, there is no automatic retry.
    pub fn fail(&mut self) {
        self.clear_streaming();
    }

    fn clear_streaming(&mut self) {
        if let Some(last) = self.entries.last_mut() {
            if last.is_bot && last.streaming {
                last.streaming = false;
            }
        }
    }

    /// Remove an entry. A user bubble immediately followed by a bot reply
    /// takes the reply with it; any other bubble is removed alone.
    pub fn remove(&mut self, id: Uuid) {
        let Some(index) = self.entries.iter().position(|e| e.id == id) else {
            return;
        };
        let take_reply = !self.entries[index].is_bot
            && self.entries.get(index + 1).is_some_and(|next| next.is_bot);
        if take_reply {
            self.entries.drain(index..index + 2);
        } else {
            self.entries.remove(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_accumulate_into_one_bubble() {
        let mut transcript = Transcript::new();
        transcript.push_user("Hello");
        transcript.begin_reply();
        // Boundaries are arbitrary byte-ish splits, not words.
        for chunk in ["Hi t", "her", "e!"] {
            transcript.append_chunk(chunk);
        }
        transcript.settle();

        let entries = transcript.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].content, "Hi there!");
        assert!(!entries[1].streaming);
    }

    #[test]
    fn test_chunks_after_terminal_event_are_dropped() {
        let mut transcript = Transcript::new();
        transcript.push_user("Hello");
        transcript.begin_reply();
        transcript.append_chunk("Hi");
        transcript.fail();
        transcript.append_chunk(" late chunk");

        assert_eq!(transcript.entries()[1].content, "Hi");
    }

    #[test]
    fn test_removing_user_turn_takes_its_reply() {
        let mut transcript = Transcript::new();
        let user_id = transcript.push_user("q1");
        transcript.begin_reply();
        transcript.append_chunk("a1");
        transcript.settle();
        transcript.push_user("q2");

        transcript.remove(user_id);
        let entries = transcript.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "q2");
    }

    #[test]
    fn test_removing_bot_or_isolated_entry_removes_only_itself() {
        let mut transcript = Transcript::new();
        transcript.push_user("q1");
        let bot_id = transcript.begin_reply();
        transcript.append_chunk("a1");
        transcript.settle();

        transcript.remove(bot_id);
        assert_eq!(transcript.entries().len(), 1);
        assert!(!transcript.entries()[0].is_bot);

        // Now the user bubble is isolated; removing it takes nothing else.
        let lone_id = transcript.entries()[0].id;
        transcript.remove(lone_id);
        assert!(transcript.entries().is_empty());

        // Removing an unknown id is a no-op.
        transcript.remove(Uuid::new_v4());
    }

    #[test]
    fn test_failed_turn_keeps_optimistic_bubbles() {
        let mut transcript = Transcript::new();
        transcript.push_user("Hello");
        transcript.begin_reply();
        transcript.fail();

        let entries = transcript.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[1].content.is_empty());
        assert!(!entries[1].streaming);
    }
}
