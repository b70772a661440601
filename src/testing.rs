//! Loopback SMTP server with scripted refusals, for probe and orchestrator tests.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::mx::MxRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Greeting,
    /// Refuses both `EHLO` and `HELO`.
    Hello,
    /// Refuses `EHLO` only.
    Ehlo,
    MailFrom,
    RcptTo,
    Quit,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Behavior {
    pub reject_at: Option<Phase>,
    pub close_after_connect: bool,
    /// Pause before the banner and before every reply.
    pub delay: Duration,
    /// Raw banner replacing the default `220` greeting.
    pub banner: Option<&'static str>,
}

impl Behavior {
    pub(crate) fn reject_at(phase: Phase) -> Self {
        Self {
            reject_at: Some(phase),
            ..Self::default()
        }
    }

    pub(crate) fn delayed(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

pub(crate) struct FakeSmtpServer {
    addr: SocketAddr,
    running: Arc<AtomicBool>,
    connections: Arc<AtomicUsize>,
    commands: Arc<Mutex<Vec<String>>>,
    acceptor: Option<JoinHandle<()>>,
}

impl FakeSmtpServer {
    pub(crate) fn start(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake smtp server");
        let addr = listener.local_addr().expect("local addr");
        let running = Arc::new(AtomicBool::new(true));
        let connections = Arc::new(AtomicUsize::new(0));
        let commands = Arc::new(Mutex::new(Vec::new()));

        let acceptor = {
            let running = Arc::clone(&running);
            let connections = Arc::clone(&connections);
            let commands = Arc::clone(&commands);
            thread::spawn(move || {
                for stream in listener.incoming() {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    let Ok(stream) = stream else { continue };
                    connections.fetch_add(1, Ordering::SeqCst);
                    if behavior.close_after_connect {
                        drop(stream);
                        continue;
                    }
                    let behavior = behavior.clone();
                    let commands = Arc::clone(&commands);
                    thread::spawn(move || {
                        let _ = serve(stream, &behavior, &commands);
                    });
                }
            })
        };

        Self {
            addr,
            running,
            connections,
            commands,
            acceptor: Some(acceptor),
        }
    }

    pub(crate) fn port(&self) -> u16 {
        self.addr.port()
    }

    pub(crate) fn mx(&self) -> MxRecord {
        MxRecord::new(10, self.addr.ip().to_string())
    }

    pub(crate) fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Command lines received so far, across all connections.
    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.lock().expect("commands lock").clone()
    }
}

impl Drop for FakeSmtpServer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        // wake the blocked accept()
        let _ = TcpStream::connect(self.addr);
        if let Some(handle) = self.acceptor.take() {
            let _ = handle.join();
        }
    }
}

fn serve(
    mut stream: TcpStream,
    behavior: &Behavior,
    commands: &Mutex<Vec<String>>,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);

    thread::sleep(behavior.delay);
    let banner = match (behavior.banner, behavior.reject_at) {
        (Some(banner), _) => banner,
        (None, Some(Phase::Greeting)) => "554 5.3.2 no service here\r\n",
        (None, _) => "220 fake.smtp.test ESMTP\r\n",
    };
    stream.write_all(banner.as_bytes())?;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let line = line.trim_end().to_string();
        commands.lock().expect("commands lock").push(line.clone());
        thread::sleep(behavior.delay);

        let verb = line.get(..4).unwrap_or("").to_ascii_uppercase();
        let (phase, ok, refused) = match verb.as_str() {
            "EHLO" => (
                Phase::Ehlo,
                "250-fake.smtp.test\r\n250 PIPELINING\r\n",
                "502 5.5.2 EHLO not implemented\r\n",
            ),
            "HELO" => (
                Phase::Hello,
                "250 fake.smtp.test\r\n",
                "550 5.7.1 not welcome\r\n",
            ),
            "MAIL" => (
                Phase::MailFrom,
                "250 2.1.0 Ok\r\n",
                "550 5.7.1 sender refused\r\n",
            ),
            "RCPT" => (
                Phase::RcptTo,
                "250 2.1.5 Ok\r\n",
                "550 5.1.1 no such user\r\n",
            ),
            "QUIT" => (Phase::Quit, "221 2.0.0 Bye\r\n", "500 5.5.1 not now\r\n"),
            _ => {
                stream.write_all(b"500 5.5.2 command not recognized\r\n")?;
                continue;
            }
        };

        let rejected = match behavior.reject_at {
            Some(Phase::Hello) => matches!(phase, Phase::Hello | Phase::Ehlo),
            Some(reject) => reject == phase,
            None => false,
        };
        stream.write_all(if rejected { refused } else { ok }.as_bytes())?;
        if phase == Phase::Quit {
            return Ok(());
        }
    }
}

/// A loopback port with nothing listening on it.
pub(crate) fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe port");
    listener.local_addr().expect("local addr").port()
}
