//! Connection manager behavior against a scripted transport
//!
//! All tests run on tokio's paused clock, so retry delays and keepalive
//! windows elapse instantly while keeping their exact ordering.

use async_trait::async_trait;
use ncpanel_core::{stop_channel, Address, ConnectionState, ControllerState, SessionEvent, SystemClock};
use ncpanel_discovery::{
    Advertisement, Browse, BrowseSession, Discovery, DiscoveryError, DiscoveryOptions,
};
use ncpanel_session::{
    AddressSource, ConnectionManager, Link, Received, SessionConfig, SessionError, Transport,
};
use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// What a scripted link does on each receive
#[derive(Clone)]
enum Step {
    Frame(Received),
    Fail(SessionError),
}

/// Outcome of one scripted connect
#[derive(Clone)]
enum Attempt {
    Refuse,
    Accept(Vec<Step>),
}

#[derive(Debug, Clone, PartialEq)]
enum Sent {
    Text(String),
    Ping,
}

#[derive(Default)]
struct Log {
    connects: Vec<Instant>,
    connected_to: Vec<Address>,
    sent: Vec<(Instant, Sent)>,
    closes: usize,
}

struct ScriptedTransport {
    attempts: Mutex<VecDeque<Attempt>>,
    log: Arc<Mutex<Log>>,
}

impl ScriptedTransport {
    fn new(attempts: Vec<Attempt>) -> (Arc<Self>, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        let transport = Arc::new(Self {
            attempts: Mutex::new(attempts.into()),
            log: log.clone(),
        });
        (transport, log)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, address: &Address) -> Result<Box<dyn Link>, SessionError> {
        {
            let mut log = self.log.lock().unwrap();
            log.connects.push(Instant::now());
            log.connected_to.push(address.clone());
        }
        let attempt = self.attempts.lock().unwrap().pop_front().unwrap_or(Attempt::Refuse);
        match attempt {
            Attempt::Refuse => Err(SessionError::Connect {
                address: address.to_string(),
                reason: "connection refused".to_string(),
            }),
            Attempt::Accept(steps) => Ok(Box::new(ScriptedLink {
                steps: steps.into(),
                log: self.log.clone(),
            })),
        }
    }
}

struct ScriptedLink {
    steps: VecDeque<Step>,
    log: Arc<Mutex<Log>>,
}

#[async_trait]
impl Link for ScriptedLink {
    async fn send_text(&mut self, text: &str) -> Result<(), SessionError> {
        self.log.lock().unwrap().sent.push((Instant::now(), Sent::Text(text.to_string())));
        Ok(())
    }

    async fn send_ping(&mut self) -> Result<(), SessionError> {
        self.log.lock().unwrap().sent.push((Instant::now(), Sent::Ping));
        Ok(())
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Received, SessionError> {
        match self.steps.pop_front() {
            Some(Step::Frame(Received::Timeout)) => {
                tokio::time::sleep(timeout).await;
                Ok(Received::Timeout)
            }
            Some(Step::Frame(frame)) => Ok(frame),
            Some(Step::Fail(e)) => Err(e),
            None => {
                tokio::time::sleep(timeout).await;
                Ok(Received::Timeout)
            }
        }
    }

    async fn close(&mut self) {
        self.log.lock().unwrap().closes += 1;
    }
}

fn address() -> Address {
    Address::new("10.0.0.42", 81)
}

fn status(line: &str) -> Step {
    Step::Frame(Received::Text(line.to_string()))
}

/// Browser that answers every open with the same advertisements, then
/// stays silent until the discovery window closes
struct ScriptedBrowser {
    ads: Vec<Advertisement>,
    opens: Arc<Mutex<Vec<Instant>>>,
}

struct ScriptedSession {
    ads: std::vec::IntoIter<Advertisement>,
}

#[async_trait]
impl Browse for ScriptedBrowser {
    async fn open(&self, _service_type: &str) -> Result<Box<dyn BrowseSession>, DiscoveryError> {
        self.opens.lock().unwrap().push(Instant::now());
        Ok(Box::new(ScriptedSession {
            ads: self.ads.clone().into_iter(),
        }))
    }
}

#[async_trait]
impl BrowseSession for ScriptedSession {
    async fn next(&mut self) -> Option<Advertisement> {
        match self.ads.next() {
            Some(ad) => Some(ad),
            None => std::future::pending().await,
        }
    }
}

fn advertised(name: &str, last_octet: u8) -> Advertisement {
    Advertisement {
        name: name.to_string(),
        hostname: format!("{}.local.", name),
        addresses: vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, last_octet))],
        port: 80,
    }
}

/// Discover source for `fluidnc` over the given advertisements
fn discover_source(ads: Vec<Advertisement>) -> (AddressSource, Arc<Mutex<Vec<Instant>>>) {
    let opens = Arc::new(Mutex::new(Vec::new()));
    let browser = ScriptedBrowser {
        ads,
        opens: opens.clone(),
    };
    let discovery = Discovery::new(Arc::new(browser), DiscoveryOptions::default());
    let source = AddressSource::Discover {
        discovery,
        name: "fluidnc".to_string(),
    };
    (source, opens)
}

fn start(
    transport: Arc<ScriptedTransport>,
) -> (mpsc::Receiver<SessionEvent>, ncpanel_core::StopSender, tokio::task::JoinHandle<()>) {
    start_with_source(transport, AddressSource::Static(address()))
}

fn start_with_source(
    transport: Arc<ScriptedTransport>,
    source: AddressSource,
) -> (mpsc::Receiver<SessionEvent>, ncpanel_core::StopSender, tokio::task::JoinHandle<()>) {
    let (events_tx, events_rx) = mpsc::channel(256);
    let (stop_tx, stop_rx) = stop_channel();
    let manager = ConnectionManager::new(
        transport,
        source,
        SessionConfig::default(),
        Arc::new(SystemClock),
        events_tx,
    );
    let handle = tokio::spawn(manager.run(stop_rx));
    (events_rx, stop_tx, handle)
}

async fn next_state(rx: &mut mpsc::Receiver<SessionEvent>) -> ConnectionState {
    next_change(rx).await.0
}

async fn next_change(rx: &mut mpsc::Receiver<SessionEvent>) -> (ConnectionState, Option<Address>) {
    loop {
        match rx.recv().await.expect("event stream ended") {
            SessionEvent::ConnectionChanged { state, address } => return (state, address),
            SessionEvent::Telemetry(_) => continue,
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_refused_connects_back_off_between_attempts() {
    let (transport, log) = ScriptedTransport::new(vec![
        Attempt::Refuse,
        Attempt::Refuse,
        Attempt::Refuse,
        Attempt::Accept(vec![]),
    ]);
    let (mut rx, stop, handle) = start(transport);

    let mut states = Vec::new();
    while states.last() != Some(&ConnectionState::Connected) {
        states.push(next_state(&mut rx).await);
    }
    stop.send(true).unwrap();
    handle.await.unwrap();

    use ConnectionState::*;
    assert_eq!(
        states,
        vec![Connecting, Backoff, Connecting, Backoff, Connecting, Backoff, Connecting, Connected]
    );

    let connects = log.lock().unwrap().connects.clone();
    assert_eq!(connects.len(), 4);
    for pair in connects.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(5));
    }
}

#[tokio::test(start_paused = true)]
async fn test_connected_event_precedes_telemetry_and_backoff_follows_failure() {
    let (transport, log) = ScriptedTransport::new(vec![
        Attempt::Accept(vec![
            status("<Idle|MPos:1.000,2.000,-3.500|FS:500,1000>"),
            Step::Frame(Received::Text("ok\r\n[MSG:INFO]".to_string())),
            status("<Run|MPos:1.000,2.000,-3.000>\n<Run|MPos:1.000,2.000,-2.500>"),
            Step::Fail(SessionError::Closed),
        ]),
        Attempt::Accept(vec![status("<Hold:0|MPos:0,0,0>")]),
    ]);
    let (mut rx, stop, handle) = start(transport);

    let mut seen = Vec::new();
    loop {
        let event = rx.recv().await.unwrap();
        let done = matches!(&event, SessionEvent::Telemetry(s) if s.state == ControllerState::Hold);
        seen.push(event);
        if done {
            break;
        }
    }
    stop.send(true).unwrap();
    handle.await.unwrap();

    let summary: Vec<String> = seen
        .iter()
        .map(|e| match e {
            SessionEvent::ConnectionChanged { state, .. } => state.to_string(),
            SessionEvent::Telemetry(s) => format!("{}@{}", s.state, s.machine_position.z),
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            "connecting", "connected", "Idle@-3.5", "Run@-3", "Run@-2.5", "backoff",
            "connecting", "connected", "Hold@0",
        ]
    );

    // Address travels with every state change.
    for event in &seen {
        if let SessionEvent::ConnectionChanged { address: a, .. } = event {
            assert_eq!(a.as_ref(), Some(&address()));
        }
    }

    // Both links were closed: one by failure, one by stop.
    assert_eq!(log.lock().unwrap().closes, 2);
}

#[tokio::test(start_paused = true)]
async fn test_polls_immediately_then_on_interval_with_keepalive() {
    let (transport, log) = ScriptedTransport::new(vec![Attempt::Accept(vec![])]);
    let (mut rx, stop, handle) = start(transport);

    assert_eq!(next_state(&mut rx).await, ConnectionState::Connecting);
    assert_eq!(next_state(&mut rx).await, ConnectionState::Connected);
    let connected_at = Instant::now();

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    stop.send(true).unwrap();
    handle.await.unwrap();

    let sent = log.lock().unwrap().sent.clone();
    assert_eq!(sent[0].1, Sent::Text("?".to_string()));
    assert!(sent[0].0 - connected_at < Duration::from_millis(1));

    let polls: Vec<Instant> = sent
        .iter()
        .filter(|(_, s)| *s == Sent::Text("?".to_string()))
        .map(|(t, _)| *t)
        .collect();
    // One every 200-250 ms over 5.5 s, plus the immediate one.
    assert!(polls.len() >= 20, "only {} polls", polls.len());
    for pair in polls.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(200));
    }

    let pings = sent.iter().filter(|(_, s)| *s == Sent::Ping).count();
    assert_eq!(pings, 1);
}

#[tokio::test(start_paused = true)]
async fn test_silence_past_grace_window_forces_backoff() {
    let (transport, log) = ScriptedTransport::new(vec![Attempt::Accept(vec![])]);
    let (mut rx, stop, handle) = start(transport);

    assert_eq!(next_state(&mut rx).await, ConnectionState::Connecting);
    assert_eq!(next_state(&mut rx).await, ConnectionState::Connected);
    let connected_at = Instant::now();

    assert_eq!(next_state(&mut rx).await, ConnectionState::Backoff);
    let elapsed = Instant::now() - connected_at;
    assert!(elapsed > Duration::from_secs(15));
    assert!(elapsed < Duration::from_secs(16));
    assert_eq!(log.lock().unwrap().closes, 1);

    // The next attempt is a fresh Connecting, never a jump back to Connected.
    assert_eq!(next_state(&mut rx).await, ConnectionState::Connecting);
    stop.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_pongs_keep_the_session_alive() {
    let mut steps = Vec::new();
    for _ in 0..1000 {
        steps.push(Step::Frame(Received::Timeout));
        steps.push(Step::Frame(Received::Pong));
    }
    let (transport, _log) = ScriptedTransport::new(vec![Attempt::Accept(steps)]);
    let (mut rx, stop, handle) = start(transport);

    assert_eq!(next_state(&mut rx).await, ConnectionState::Connecting);
    assert_eq!(next_state(&mut rx).await, ConnectionState::Connected);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(rx.try_recv().is_err(), "session should still be up");

    stop.send(true).unwrap();
    assert_eq!(next_state(&mut rx).await, ConnectionState::Idle);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_backoff_ends_promptly() {
    let (transport, log) = ScriptedTransport::new(vec![Attempt::Refuse]);
    let (mut rx, stop, handle) = start(transport);

    assert_eq!(next_state(&mut rx).await, ConnectionState::Connecting);
    assert_eq!(next_state(&mut rx).await, ConnectionState::Backoff);
    let entered = Instant::now();

    stop.send(true).unwrap();
    assert_eq!(next_state(&mut rx).await, ConnectionState::Idle);
    handle.await.unwrap();

    assert!(Instant::now() - entered < Duration::from_secs(1));
    assert_eq!(log.lock().unwrap().connects.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_discovered_controller_is_rediscovered_after_each_failure() {
    let (transport, log) = ScriptedTransport::new(vec![]);
    let (source, opens) = discover_source(vec![advertised("other", 7), advertised("fluidnc", 9)]);
    let (mut rx, stop, handle) = start_with_source(transport, source);

    let mut changes = Vec::new();
    for _ in 0..7 {
        changes.push(next_change(&mut rx).await);
    }
    stop.send(true).unwrap();
    handle.await.unwrap();

    use ConnectionState::*;
    let states: Vec<ConnectionState> = changes.iter().map(|(s, _)| *s).collect();
    assert_eq!(
        states,
        vec![Discovering, Connecting, Backoff, Discovering, Connecting, Backoff, Discovering]
    );

    // Rediscovery starts from a clean slate; the old address is not reported.
    let discovered = Address::new("10.0.0.9", 81);
    for (state, address) in &changes {
        match state {
            Discovering => assert_eq!(address, &None),
            _ => assert_eq!(address.as_ref(), Some(&discovered)),
        }
    }

    let log = log.lock().unwrap();
    assert_eq!(log.connected_to, vec![discovered.clone(), discovered]);

    let opens = opens.lock().unwrap().clone();
    assert!(opens.len() >= 2);
    for pair in opens.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(10));
    }
}

#[tokio::test(start_paused = true)]
async fn test_missing_controller_backs_off_between_browses() {
    let (transport, log) = ScriptedTransport::new(vec![]);
    let (source, opens) = discover_source(vec![advertised("other", 7)]);
    let (mut rx, stop, handle) = start_with_source(transport, source);

    let mut states = Vec::new();
    for _ in 0..6 {
        states.push(next_state(&mut rx).await);
    }
    stop.send(true).unwrap();
    handle.await.unwrap();

    use ConnectionState::*;
    assert_eq!(states, vec![Discovering, Backoff, Discovering, Backoff, Discovering, Backoff]);
    assert!(log.lock().unwrap().connects.is_empty());

    // Five seconds of browsing plus the full retry delay between browses.
    let opens = opens.lock().unwrap().clone();
    assert_eq!(opens.len(), 3);
    for pair in opens.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(10));
    }
}
