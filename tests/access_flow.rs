//! End-to-end dispatch scenarios over fake collaborators: the command state
//! machine, the decision finalization machine, and the stores they drive.

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use domofon::audit::AuditSink;
use domofon::actuator::Actuator;
use domofon::dispatch::AccessController;
use domofon::gateway::{
    Controls, DecisionAction, DecisionEvent, Event, Gateway, MessageEvent, NotificationHandle,
    SenderProfile, Update,
};
use domofon::store::WhitelistStore;

const ADMIN_1: &str = "111";
const ADMIN_2: &str = "222";
const GUEST: &str = "123456";

#[derive(Debug, Clone)]
struct Sent {
    recipient: String,
    text: String,
    controls: Option<Controls>,
    reply_to: Option<i64>,
    handle: NotificationHandle,
}

#[derive(Default)]
struct FakeGateway {
    sent: Mutex<Vec<Sent>>,
    retracted: Mutex<Vec<(String, NotificationHandle)>>,
    acknowledged: Mutex<Vec<String>>,
    next_message_id: AtomicI64,
}

impl FakeGateway {
    fn sent_to(&self, recipient: &str) -> Vec<Sent> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.recipient == recipient)
            .cloned()
            .collect()
    }

    fn record_send(
        &self,
        recipient: &str,
        text: &str,
        controls: Option<Controls>,
        reply_to: Option<i64>,
    ) -> NotificationHandle {
        let handle = NotificationHandle(self.next_message_id.fetch_add(1, Ordering::SeqCst));
        self.sent.lock().unwrap().push(Sent {
            recipient: recipient.to_string(),
            text: text.to_string(),
            controls,
            reply_to,
            handle,
        });
        handle
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn fetch_updates(&self, _offset: Option<i64>) -> anyhow::Result<Vec<Update>> {
        Ok(Vec::new())
    }

    async fn send_notification(
        &self,
        recipient: &str,
        text: &str,
        controls: Option<Controls>,
    ) -> anyhow::Result<NotificationHandle> {
        Ok(self.record_send(recipient, text, controls, None))
    }

    async fn send_reply(
        &self,
        recipient: &str,
        text: &str,
        reply_to: i64,
        controls: Option<Controls>,
    ) -> anyhow::Result<NotificationHandle> {
        Ok(self.record_send(recipient, text, controls, Some(reply_to)))
    }

    async fn retract_controls(
        &self,
        recipient: &str,
        handle: NotificationHandle,
    ) -> anyhow::Result<()> {
        self.retracted
            .lock()
            .unwrap()
            .push((recipient.to_string(), handle));
        Ok(())
    }

    async fn acknowledge_decision(&self, decision_id: &str) -> anyhow::Result<()> {
        self.acknowledged
            .lock()
            .unwrap()
            .push(decision_id.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ActuatorEvent {
    Engage(tokio::time::Instant),
    Disengage(tokio::time::Instant),
}

#[derive(Default)]
struct FakeActuator {
    events: Mutex<Vec<ActuatorEvent>>,
}

#[async_trait]
impl Actuator for FakeActuator {
    async fn engage(&self) -> anyhow::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(ActuatorEvent::Engage(tokio::time::Instant::now()));
        Ok(())
    }

    async fn disengage(&self) -> anyhow::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(ActuatorEvent::Disengage(tokio::time::Instant::now()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingAudit {
    lines: Mutex<Vec<String>>,
}

impl AuditSink for RecordingAudit {
    fn record(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}

struct Harness {
    controller: AccessController,
    gateway: Arc<FakeGateway>,
    actuator: Arc<FakeActuator>,
    audit: Arc<RecordingAudit>,
    _tmp: TempDir,
}

fn harness() -> Harness {
    let tmp = TempDir::new().unwrap();
    let admins = vec![ADMIN_1.to_string(), ADMIN_2.to_string()];
    let whitelist =
        WhitelistStore::load_or_seed(tmp.path().join("whitelist.json"), &admins).unwrap();

    let gateway = Arc::new(FakeGateway::default());
    let actuator = Arc::new(FakeActuator::default());
    let audit = Arc::new(RecordingAudit::default());

    let controller = AccessController::new(
        admins,
        whitelist,
        gateway.clone(),
        actuator.clone(),
        audit.clone(),
    );

    Harness {
        controller,
        gateway,
        actuator,
        audit,
        _tmp: tmp,
    }
}

fn message(sender: &str, text: &str) -> Event {
    Event::Message(MessageEvent {
        sender: sender.to_string(),
        text: text.to_string(),
        profile: SenderProfile {
            first_name: "Ana".to_string(),
            username: "ana_q".to_string(),
        },
        message_id: 555,
    })
}

fn decision(action: DecisionAction, requester: &str) -> Event {
    Event::Decision(DecisionEvent {
        decision_id: "cb-1".to_string(),
        action,
        requester: requester.to_string(),
        issuer: ADMIN_1.to_string(),
    })
}

// ── Scenario A: unauthorized /start ─────────────────────────────────────────

#[tokio::test]
async fn unauthorized_start_prompts_register_and_stays_quiet() {
    let mut h = harness();
    h.controller
        .handle_event(message(GUEST, "/start"))
        .await
        .unwrap();

    let to_guest = h.gateway.sent_to(GUEST);
    assert_eq!(to_guest.len(), 1);
    assert_eq!(to_guest[0].text, "Click register to submit request");
    assert_eq!(
        to_guest[0].controls,
        Some(Controls::Keyboard(vec!["register".to_string()]))
    );

    assert!(h.gateway.sent_to(ADMIN_1).is_empty());
    assert!(h.gateway.sent_to(ADMIN_2).is_empty());
    assert!(
        h.audit
            .lines
            .lock()
            .unwrap()
            .iter()
            .any(|l| l.starts_with("start cmd by"))
    );
}

#[tokio::test]
async fn whitelisted_start_greets_with_open_keyboard() {
    let mut h = harness();
    h.controller
        .handle_event(message(ADMIN_1, "/start"))
        .await
        .unwrap();

    let to_admin = h.gateway.sent_to(ADMIN_1);
    assert_eq!(to_admin.len(), 1);
    assert_eq!(to_admin[0].text, "sup");
    assert_eq!(
        to_admin[0].controls,
        Some(Controls::Keyboard(vec!["open".to_string()]))
    );
}

// ── Scenario B: register broadcast ──────────────────────────────────────────

#[tokio::test]
async fn register_broadcasts_approval_request_to_every_admin() {
    let mut h = harness();
    h.controller
        .handle_event(message(GUEST, "register"))
        .await
        .unwrap();

    for admin in [ADMIN_1, ADMIN_2] {
        let to_admin = h.gateway.sent_to(admin);
        assert_eq!(to_admin.len(), 1, "admin {admin} should get one request");
        assert!(to_admin[0].text.contains("Name: Ana"));
        assert!(to_admin[0].text.contains("Username: ana_q"));
        assert!(to_admin[0].text.contains(&format!("ID: {GUEST}")));
        assert_eq!(
            to_admin[0].controls,
            Some(Controls::Approval {
                requester: GUEST.to_string()
            })
        );
    }

    assert_eq!(h.controller.pending().len(), 1);
    assert_eq!(h.controller.ledger().len(), 2);
}

#[tokio::test]
async fn register_when_already_whitelisted_replies_already() {
    let mut h = harness();
    h.controller
        .handle_event(message(ADMIN_1, "register"))
        .await
        .unwrap();

    let to_admin = h.gateway.sent_to(ADMIN_1);
    assert_eq!(to_admin.len(), 1);
    assert_eq!(to_admin[0].text, "already");
    assert!(h.controller.pending().is_empty());
}

// ── Scenario C: allow ───────────────────────────────────────────────────────

#[tokio::test]
async fn allow_whitelists_once_and_retracts_everywhere() {
    let mut h = harness();
    h.controller
        .handle_event(message(GUEST, "register"))
        .await
        .unwrap();
    let request_handles: Vec<NotificationHandle> = [ADMIN_1, ADMIN_2]
        .into_iter()
        .map(|admin| h.gateway.sent_to(admin)[0].handle)
        .collect();

    h.controller
        .handle_event(decision(DecisionAction::Allow, GUEST))
        .await
        .unwrap();

    assert!(h.controller.whitelist().contains(GUEST));
    assert_eq!(h.controller.whitelist().len(), 3);

    let to_guest = h.gateway.sent_to(GUEST);
    assert_eq!(to_guest.len(), 1);
    assert_eq!(to_guest[0].text, "welcome");

    for admin in [ADMIN_1, ADMIN_2] {
        assert!(
            h.gateway
                .sent_to(admin)
                .iter()
                .any(|s| s.text == format!("Allowed {GUEST}"))
        );
    }

    let retracted = h.gateway.retracted.lock().unwrap().clone();
    assert_eq!(retracted.len(), 2);
    for handle in request_handles {
        assert!(retracted.iter().any(|(_, h)| *h == handle));
    }
    assert!(h.controller.ledger().is_empty());
    assert_eq!(*h.gateway.acknowledged.lock().unwrap(), vec!["cb-1"]);
}

#[tokio::test]
async fn allow_survives_process_restart_of_whitelist() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("whitelist.json");
    let admins = vec![ADMIN_1.to_string(), ADMIN_2.to_string()];

    {
        let whitelist = WhitelistStore::load_or_seed(&path, &admins).unwrap();
        let gateway = Arc::new(FakeGateway::default());
        let mut controller = AccessController::new(
            admins.clone(),
            whitelist,
            gateway,
            Arc::new(FakeActuator::default()),
            Arc::new(RecordingAudit::default()),
        );
        controller
            .handle_event(message(GUEST, "register"))
            .await
            .unwrap();
        controller
            .handle_event(decision(DecisionAction::Allow, GUEST))
            .await
            .unwrap();
    }

    let reloaded = WhitelistStore::load_or_seed(&path, &admins).unwrap();
    assert!(reloaded.contains(GUEST));
}

// ── Scenario D: deny ────────────────────────────────────────────────────────

#[tokio::test]
async fn deny_retracts_without_whitelisting() {
    let mut h = harness();
    h.controller
        .handle_event(message(GUEST, "register"))
        .await
        .unwrap();
    h.controller
        .handle_event(decision(DecisionAction::Deny, GUEST))
        .await
        .unwrap();

    assert!(!h.controller.whitelist().contains(GUEST));
    assert!(h.controller.pending().is_empty());

    let to_guest = h.gateway.sent_to(GUEST);
    assert_eq!(to_guest.len(), 1);
    assert_eq!(to_guest[0].text, "denied");
    assert_eq!(
        to_guest[0].controls,
        Some(Controls::Keyboard(vec!["register".to_string()]))
    );

    for admin in [ADMIN_1, ADMIN_2] {
        assert!(
            h.gateway
                .sent_to(admin)
                .iter()
                .any(|s| s.text == format!("Denied {GUEST}"))
        );
    }

    assert_eq!(h.gateway.retracted.lock().unwrap().len(), 2);
    assert!(h.controller.ledger().is_empty());
    assert_eq!(*h.gateway.acknowledged.lock().unwrap(), vec!["cb-1"]);
}

// ── Exactly-once resolution / idempotence ───────────────────────────────────

#[tokio::test]
async fn replayed_allow_is_an_audited_noop() {
    let mut h = harness();
    h.controller
        .handle_event(message(GUEST, "register"))
        .await
        .unwrap();
    h.controller
        .handle_event(decision(DecisionAction::Allow, GUEST))
        .await
        .unwrap();
    h.controller
        .handle_event(decision(DecisionAction::Allow, GUEST))
        .await
        .unwrap();

    // Whitelist state is that of applying the decision once.
    assert_eq!(h.controller.whitelist().len(), 3);
    // The guest got exactly one welcome.
    let welcomes = h
        .gateway
        .sent_to(GUEST)
        .iter()
        .filter(|s| s.text == "welcome")
        .count();
    assert_eq!(welcomes, 1);
    assert!(
        h.audit
            .lines
            .lock()
            .unwrap()
            .iter()
            .any(|l| l.contains("not found in pending requests"))
    );
}

#[tokio::test]
async fn decision_for_unknown_requester_is_nonfatal() {
    let mut h = harness();
    h.controller
        .handle_event(decision(DecisionAction::Allow, "999"))
        .await
        .unwrap();

    assert!(!h.controller.whitelist().contains("999"));
    // The callback is still acknowledged so the admin's client settles.
    assert_eq!(*h.gateway.acknowledged.lock().unwrap(), vec!["cb-1"]);
}

#[tokio::test]
async fn repeated_register_keeps_single_pending_request() {
    let mut h = harness();
    h.controller
        .handle_event(message(GUEST, "register"))
        .await
        .unwrap();
    h.controller
        .handle_event(message(GUEST, "register"))
        .await
        .unwrap();

    assert_eq!(h.controller.pending().len(), 1);

    h.controller
        .handle_event(decision(DecisionAction::Allow, GUEST))
        .await
        .unwrap();
    assert_eq!(h.controller.whitelist().len(), 3);
}

// ── Scenario E: open ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn whitelisted_guest_open_pulses_actuator_and_notifies_admins() {
    let mut h = harness();
    h.controller
        .handle_event(message(GUEST, "register"))
        .await
        .unwrap();
    h.controller
        .handle_event(decision(DecisionAction::Allow, GUEST))
        .await
        .unwrap();

    h.controller
        .handle_event(message(GUEST, "open"))
        .await
        .unwrap();

    let events = h.actuator.events.lock().unwrap().clone();
    let [ActuatorEvent::Engage(engaged_at), ActuatorEvent::Disengage(disengaged_at)] =
        events.as_slice()
    else {
        panic!("expected engage then disengage, got {events:?}");
    };
    assert!(*disengaged_at - *engaged_at >= Duration::from_secs(7));

    let to_guest = h.gateway.sent_to(GUEST);
    let open_reply = to_guest
        .iter()
        .find(|s| s.text == "👋️. Door is open!")
        .expect("open confirmation");
    assert_eq!(open_reply.reply_to, Some(555));

    for admin in [ADMIN_1, ADMIN_2] {
        assert!(
            h.gateway
                .sent_to(admin)
                .iter()
                .any(|s| s.text == "You have a guest Ana")
        );
    }
    assert!(
        h.audit
            .lines
            .lock()
            .unwrap()
            .iter()
            .any(|l| l == "Opened by Ana")
    );
}

#[tokio::test(start_paused = true)]
async fn admin_open_sends_no_guest_notice() {
    let mut h = harness();
    h.controller
        .handle_event(message(ADMIN_1, "open"))
        .await
        .unwrap();

    assert_eq!(h.actuator.events.lock().unwrap().len(), 2);
    for admin in [ADMIN_1, ADMIN_2] {
        assert!(
            !h.gateway
                .sent_to(admin)
                .iter()
                .any(|s| s.text.starts_with("You have a guest"))
        );
    }
}

// ── Scenario F: unauthorized open ───────────────────────────────────────────

#[tokio::test]
async fn unauthorized_open_never_touches_actuator() {
    let mut h = harness();
    h.controller
        .handle_event(message(GUEST, "open"))
        .await
        .unwrap();

    assert!(h.actuator.events.lock().unwrap().is_empty());

    let to_guest = h.gateway.sent_to(GUEST);
    assert_eq!(to_guest.len(), 1);
    assert_eq!(to_guest[0].text, "✋️ not registered");
    assert_eq!(to_guest[0].reply_to, Some(555));
    assert!(
        h.audit
            .lines
            .lock()
            .unwrap()
            .iter()
            .any(|l| l == "TRIED TO OPEN by Ana")
    );
}

// ── Fallback intents ────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_text_gets_fallback_prompt() {
    let mut h = harness();
    h.controller
        .handle_event(message(ADMIN_1, "hello there"))
        .await
        .unwrap();
    h.controller
        .handle_event(message(GUEST, "hello there"))
        .await
        .unwrap();

    assert_eq!(h.gateway.sent_to(ADMIN_1)[0].text, "?");
    assert_eq!(
        h.gateway.sent_to(GUEST)[0].text,
        "Click register to submit request"
    );
}
