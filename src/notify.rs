use crate::member::Member;

/// outbound member notification delivery
///
/// Fire-and-forget: delivery failures are logged and never block the
/// financial operation that triggered them.
pub trait NotificationSink {
    fn notify(&mut self, member: &Member, subject: &str, body: &str) -> std::io::Result<()>;
}

/// send through the sink, recovering from failures by logging them
pub fn notify_best_effort(
    sink: &mut dyn NotificationSink,
    member: &Member,
    subject: &str,
    body: &str,
) {
    if let Err(err) = sink.notify(member, subject, body) {
        tracing::warn!(
            member = %member.id,
            subject,
            error = %err,
            "notification delivery failed"
        );
    }
}

/// default sink that only logs the notification
#[derive(Debug, Default)]
pub struct LoggingSink;

impl NotificationSink for LoggingSink {
    fn notify(&mut self, member: &Member, subject: &str, body: &str) -> std::io::Result<()> {
        tracing::info!(member = %member.id, subject, body, "member notification");
        Ok(())
    }
}

/// test sink that records every notification, optionally failing
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub sent: Vec<(String, String)>,
    pub fail: bool,
}

impl NotificationSink for RecordingSink {
    fn notify(&mut self, _member: &Member, subject: &str, body: &str) -> std::io::Result<()> {
        if self.fail {
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "delivery refused",
            ));
        }
        self.sent.push((subject.to_string(), body.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn member() -> Member {
        Member::new(
            "Jane Wanjiku",
            Uuid::new_v4(),
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        )
    }

    #[test]
    fn test_recording_sink_captures_messages() {
        let mut sink = RecordingSink::default();
        let member = member();

        notify_best_effort(&mut sink, &member, "Welcome", "You are registered.");

        assert_eq!(sink.sent.len(), 1);
        assert_eq!(sink.sent[0].0, "Welcome");
    }

    #[test]
    fn test_delivery_failure_is_swallowed() {
        let mut sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let member = member();

        // must not panic or propagate
        notify_best_effort(&mut sink, &member, "Welcome", "You are registered.");
        assert!(sink.sent.is_empty());
    }
}
