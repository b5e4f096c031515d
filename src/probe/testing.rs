//! Loopback SMTP servers for probe tests.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::mx::ExchangeHost;
use crate::mx::tests::StubResolver;

use super::options::ProbeOptions;

#[derive(Clone)]
pub(crate) enum Mailboxes {
    All,
    Only(Vec<&'static str>),
    None,
}

#[derive(Clone)]
pub(crate) struct MockSmtp {
    pub name: &'static str,
    pub banner: &'static str,
    pub mailboxes: Mailboxes,
    /// Accept the TCP connection but never answer.
    pub mute: bool,
    /// Send `220-` continuation lines every 300 ms instead of a banner.
    pub trickle: bool,
    /// Reply to `EHLO` with this line instead of accepting it.
    pub ehlo_reply: Option<&'static str>,
}

impl MockSmtp {
    pub(crate) fn new(name: &'static str, mailboxes: Mailboxes) -> Self {
        Self {
            name,
            banner: "220 mock.smtp.test ESMTP",
            mailboxes,
            mute: false,
            trickle: false,
            ehlo_reply: None,
        }
    }

    pub(crate) fn banner(mut self, banner: &'static str) -> Self {
        self.banner = banner;
        self
    }

    pub(crate) fn mute(mut self) -> Self {
        self.mute = true;
        self
    }

    pub(crate) fn trickle(mut self) -> Self {
        self.trickle = true;
        self
    }

    pub(crate) fn refuse_ehlo(mut self, reply: &'static str) -> Self {
        self.ehlo_reply = Some(reply);
        self
    }

    /// Serves connections forever on a background thread; every command seen is
    /// reported on `log` as `(server name, line)`.
    pub(crate) fn spawn(self, log: mpsc::Sender<(&'static str, String)>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let port = listener.local_addr().expect("addr").port();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                log.send((self.name, "CONNECT".to_string())).ok();
                if self.mute {
                    thread::sleep(Duration::from_secs(2));
                    continue;
                }
                if self.trickle {
                    for _ in 0..20 {
                        if stream.write_all(b"220-still here\r\n").is_err() {
                            break;
                        }
                        thread::sleep(Duration::from_millis(300));
                    }
                    continue;
                }
                let _ = self.handle_session(&mut stream, &log);
            }
        });
        port
    }

    fn handle_session(
        &self,
        stream: &mut TcpStream,
        log: &mpsc::Sender<(&'static str, String)>,
    ) -> io::Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        write!(stream, "{}\r\n", self.banner)?;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                return Ok(());
            }
            let line = line.trim_end().to_string();
            log.send((self.name, line.clone())).ok();
            let upper = line.to_ascii_uppercase();
            let reply = if upper.starts_with("EHLO") {
                match self.ehlo_reply {
                    Some(refusal) => format!("{refusal}\r\n"),
                    None => format!("250-{}\r\n250 SIZE 10240000\r\n", self.name),
                }
            } else if upper.starts_with("HELO") {
                format!("250 {}\r\n", self.name)
            } else if upper.starts_with("MAIL FROM:") {
                "250 2.1.0 Ok\r\n".to_string()
            } else if upper.starts_with("RCPT TO:") {
                let recipient = line[8..].trim().trim_start_matches('<').trim_end_matches('>');
                if self.accepts(recipient) {
                    "250 2.1.5 Ok\r\n".to_string()
                } else {
                    "550 5.1.1 User unknown\r\n".to_string()
                }
            } else if upper.starts_with("QUIT") {
                stream.write_all(b"221 2.0.0 Bye\r\n")?;
                return Ok(());
            } else {
                "502 5.5.2 Command not recognized\r\n".to_string()
            };
            stream.write_all(reply.as_bytes())?;
            stream.flush()?;
        }
    }

    fn accepts(&self, recipient: &str) -> bool {
        match &self.mailboxes {
            Mailboxes::All => true,
            Mailboxes::Only(list) => list.iter().any(|m| m.eq_ignore_ascii_case(recipient)),
            Mailboxes::None => false,
        }
    }
}

/// Probe options pointed at loopback with short deadlines.
pub(crate) fn fast_options() -> ProbeOptions {
    ProbeOptions::default().with_timeout(Duration::from_millis(500))
}

/// Stub resolver returning `hosts` for `example.com` and routing each
/// hostname to its loopback port.
pub(crate) fn stub_for(
    hosts: Vec<ExchangeHost>,
    routes: Vec<(&'static str, u16)>,
) -> StubResolver {
    StubResolver::new(move |domain| {
        assert_eq!(domain, "example.com");
        Ok(hosts.clone())
    })
    .with_routes(routes)
}

/// Port with nothing listening on it.
pub(crate) fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

/// Drains everything logged so far.
pub(crate) fn drain(log: &mpsc::Receiver<(&'static str, String)>) -> Vec<(&'static str, String)> {
    let mut out = Vec::new();
    while let Ok(entry) = log.recv_timeout(Duration::from_millis(200)) {
        out.push(entry);
    }
    out
}
