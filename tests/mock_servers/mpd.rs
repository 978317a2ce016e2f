#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Mock MPD server for testing
//!
//! Speaks the line protocol: greeting, `key: value` replies terminated by
//! `OK`, `ACK` errors and command lists.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rs_gpio_mpdc::mpd::protocol::parse_command_line;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Mock player state
#[derive(Debug, Clone)]
pub struct MockMpdState {
    pub state: &'static str, // play, pause, stop
    pub volume: i32,         // -1 = no mixer
    pub outputs: Vec<(u32, String, bool)>,
    pub playlists: Vec<String>,
    pub loaded: Option<String>,
    pub password: Option<String>,
    /// Every command received, except `ping`, as `name arg...`
    pub log: Vec<String>,
}

impl Default for MockMpdState {
    fn default() -> Self {
        Self {
            state: "stop",
            volume: 50,
            outputs: vec![(0, "DAC".into(), true), (1, "Stream".into(), false)],
            playlists: vec!["Jazz".into(), "Morning".into(), "Radio".into()],
            loaded: None,
            password: None,
            log: Vec::new(),
        }
    }
}

#[derive(Default)]
struct Behaviour {
    /// Accept, then close without a greeting
    refuse: AtomicBool,
    /// Accept, then never say anything
    silent: AtomicBool,
    /// Close the connection when this command arrives (one-shot)
    drop_on: Mutex<Option<String>>,
    /// Reply ACK to this command
    ack_on: Mutex<Option<String>>,
}

/// Mock MPD server
pub struct MockMpdServer {
    addr: Option<SocketAddr>,
    state: Arc<Mutex<MockMpdState>>,
    behaviour: Arc<Behaviour>,
    connections: Arc<AtomicUsize>,
    generation: watch::Sender<u64>,
    handle: JoinHandle<()>,
}

impl MockMpdServer {
    /// Start a mock server on a random local port
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut server = Self::spawn_with(move |shared| {
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    shared.serve(stream);
                }
            })
        });
        server.addr = Some(addr);
        server
    }

    /// Start a mock server on a Unix socket
    #[cfg(unix)]
    pub async fn start_unix(path: &std::path::Path) -> Self {
        let listener = tokio::net::UnixListener::bind(path).unwrap();
        Self::spawn_with(move |shared| {
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    shared.serve(stream);
                }
            })
        })
    }

    fn spawn_with(accept: impl FnOnce(Shared) -> JoinHandle<()>) -> Self {
        let state = Arc::new(Mutex::new(MockMpdState::default()));
        let behaviour = Arc::new(Behaviour::default());
        let connections = Arc::new(AtomicUsize::new(0));
        let (generation, _) = watch::channel(0u64);

        let shared = Shared {
            state: state.clone(),
            behaviour: behaviour.clone(),
            connections: connections.clone(),
            generation: generation.subscribe(),
        };
        let handle = accept(shared);

        Self {
            addr: None,
            state,
            behaviour,
            connections,
            generation,
            handle,
        }
    }

    /// TCP port
    pub fn port(&self) -> u16 {
        self.addr.unwrap().port()
    }

    /// Connections accepted so far
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Close every open connection
    pub fn drop_connections(&self) {
        self.generation.send_modify(|g| *g += 1);
    }

    /// Close new connections immediately
    pub fn set_refuse(&self, refuse: bool) {
        self.behaviour.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Never greet new connections
    pub fn set_silent(&self, silent: bool) {
        self.behaviour.silent.store(silent, Ordering::SeqCst);
    }

    /// Drop the connection when `command` next arrives
    pub fn drop_on(&self, command: &str) {
        *self.behaviour.drop_on.lock().unwrap() = Some(command.to_string());
    }

    /// Reply ACK to `command` from now on
    pub fn ack_on(&self, command: &str) {
        *self.behaviour.ack_on.lock().unwrap() = Some(command.to_string());
    }

    /// Inspect or change the player state
    pub fn with_state<R>(&self, f: impl FnOnce(&mut MockMpdState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// Commands received so far (excluding `ping`)
    pub fn log(&self) -> Vec<String> {
        self.with_state(|s| s.log.clone())
    }

    /// Forget the command log
    pub fn clear_log(&self) {
        self.with_state(|s| s.log.clear());
    }

    /// Stop the mock server
    pub fn stop(self) {
        self.handle.abort();
        self.drop_connections();
    }
}

#[derive(Clone)]
struct Shared {
    state: Arc<Mutex<MockMpdState>>,
    behaviour: Arc<Behaviour>,
    connections: Arc<AtomicUsize>,
    generation: watch::Receiver<u64>,
}

impl Shared {
    fn serve<S>(&self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        self.connections.fetch_add(1, Ordering::SeqCst);
        if self.behaviour.refuse.load(Ordering::SeqCst) {
            return;
        }
        let shared = self.clone();
        tokio::spawn(async move { shared.handle_connection(stream).await });
    }

    async fn handle_connection<S>(mut self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.generation.mark_unchanged();
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);

        if self.behaviour.silent.load(Ordering::SeqCst) {
            let _ = self.generation.changed().await;
            return;
        }
        if writer.write_all(b"OK MPD 0.23.5\n").await.is_err() {
            return;
        }

        let mut list: Option<Vec<String>> = None;
        let mut line = String::new();
        loop {
            line.clear();
            tokio::select! {
                _ = self.generation.changed() => return,
                read = reader.read_line(&mut line) => match read {
                    Ok(0) | Err(_) => return,
                    Ok(_) => {}
                },
            }
            let text = line.trim_end().to_string();

            if let Some(commands) = list.as_mut() {
                if text == "command_list_end" {
                    let commands = list.take().unwrap_or_default();
                    match self.run_list(&commands) {
                        Some(reply) => {
                            if writer.write_all(reply.as_bytes()).await.is_err() {
                                return;
                            }
                        }
                        None => return,
                    }
                } else {
                    commands.push(text);
                }
                continue;
            }

            if text == "command_list_begin" {
                list = Some(Vec::new());
                continue;
            }
            if text == "close" {
                return;
            }

            match self.run_list(&[text]) {
                Some(reply) => {
                    if writer.write_all(reply.as_bytes()).await.is_err() {
                        return;
                    }
                }
                None => return,
            }
        }
    }

    /// Run commands; `None` means drop the connection.
    fn run_list(&self, commands: &[String]) -> Option<String> {
        let mut out = String::new();
        for (index, line) in commands.iter().enumerate() {
            let Some((name, args)) = parse_command_line(line) else {
                return Some(format!("ACK [5@{}] {{}} unknown command\n", index));
            };

            {
                let mut drop_on = self.behaviour.drop_on.lock().unwrap();
                if drop_on.as_deref() == Some(name.as_str()) {
                    *drop_on = None;
                    return None;
                }
            }
            if self.behaviour.ack_on.lock().unwrap().as_deref() == Some(name.as_str()) {
                return Some(format!("ACK [2@{}] {{{}}} refused by test\n", index, name));
            }

            let mut state = self.state.lock().unwrap();
            if name != "ping" {
                let mut entry = name.clone();
                for a in &args {
                    entry.push(' ');
                    entry.push_str(a);
                }
                state.log.push(entry);
            }
            match execute(&mut state, &name, &args) {
                Ok(reply) => out.push_str(&reply),
                Err((code, msg)) => {
                    return Some(format!("ACK [{}@{}] {{{}}} {}\n", code, index, name, msg));
                }
            }
        }
        out.push_str("OK\n");
        Some(out)
    }
}

fn execute(state: &mut MockMpdState, name: &str, args: &[String]) -> Result<String, (u32, String)> {
    let arg = |i: usize| args.get(i).map(String::as_str).ok_or((2, "missing argument".to_string()));
    match name {
        "ping" | "clear" => Ok(String::new()),
        "password" => {
            if state.password.as_deref() == Some(arg(0)?) {
                Ok(String::new())
            } else {
                Err((3, "incorrect password".into()))
            }
        }
        "status" => {
            let mut reply = format!("volume: {}\nrepeat: 0\nstate: {}\n", state.volume, state.state);
            if state.volume < 0 {
                reply = format!("repeat: 0\nstate: {}\n", state.state);
            }
            Ok(reply)
        }
        "play" => {
            state.state = "play";
            Ok(String::new())
        }
        "stop" => {
            state.state = "stop";
            Ok(String::new())
        }
        "pause" => {
            state.state = if arg(0)? == "1" { "pause" } else { "play" };
            Ok(String::new())
        }
        "next" | "previous" => Ok(String::new()),
        "setvol" => {
            let v: i32 = arg(0)?.parse().map_err(|_| (2, "bad volume".to_string()))?;
            if !(0..=100).contains(&v) {
                return Err((2, "Invalid volume value".into()));
            }
            state.volume = v;
            Ok(String::new())
        }
        "outputs" => Ok(state
            .outputs
            .iter()
            .map(|(id, name, enabled)| {
                format!(
                    "outputid: {}\noutputname: {}\nplugin: alsa\noutputenabled: {}\n",
                    id,
                    name,
                    u8::from(*enabled)
                )
            })
            .collect()),
        "enableoutput" | "disableoutput" => {
            let id: u32 = arg(0)?.parse().map_err(|_| (2, "bad id".to_string()))?;
            let output = state
                .outputs
                .iter_mut()
                .find(|o| o.0 == id)
                .ok_or((50, "No such audio output".to_string()))?;
            output.2 = name == "enableoutput";
            Ok(String::new())
        }
        "listplaylists" => Ok(state
            .playlists
            .iter()
            .map(|p| format!("playlist: {}\nLast-Modified: 2024-01-01T00:00:00Z\n", p))
            .collect()),
        "load" => {
            let wanted = arg(0)?.to_string();
            if !state.playlists.contains(&wanted) {
                return Err((50, "No such playlist".into()));
            }
            state.loaded = Some(wanted);
            Ok(String::new())
        }
        _ => Err((5, format!("unknown command \"{}\"", name))),
    }
}
