//! Minimal passive-mode FTP session over TCP.
//!
//! Implements only what [`FtpSession`] needs: login, binary transfers,
//! delete, mkdir, cwd and `LIST -a`.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream};
use std::time::Duration;

use super::FtpSession;

/// Read timeout applied to control and data connections
const IO_TIMEOUT: Duration = Duration::from_secs(30);

// == Reply ==
/// A complete (possibly multi-line) server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub text: String,
}

impl Reply {
    /// Passes the reply through if its code is one of `codes`.
    fn require(self, codes: &[u16]) -> io::Result<Reply> {
        if codes.contains(&self.code) {
            Ok(self)
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("unexpected FTP reply: {}", self.text),
            ))
        }
    }
}

/// Reads one reply, following `123-` continuation lines until `123 `.
fn read_reply<R: BufRead>(reader: &mut R) -> io::Result<Reply> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }

    let code: u16 = line
        .get(..3)
        .and_then(|c| c.parse().ok())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed FTP reply: {}", line.trim_end()),
            )
        })?;

    let mut text = line.trim_end().to_string();
    if line.as_bytes().get(3) == Some(&b'-') {
        let terminator = format!("{} ", code);
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            text.push('\n');
            text.push_str(line.trim_end());
            if line.starts_with(&terminator) {
                break;
            }
        }
    }

    Ok(Reply { code, text })
}

/// Extracts the data address from a `227 Entering Passive Mode` reply.
fn parse_pasv(text: &str) -> io::Result<SocketAddr> {
    let invalid = || {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("malformed PASV reply: {}", text),
        )
    };

    let body = text.get(3..).ok_or_else(invalid)?;
    let start = body.find(|c: char| c.is_ascii_digit()).ok_or_else(invalid)?;
    let numbers: Vec<u8> = body[start..]
        .split(|c: char| !(c.is_ascii_digit() || c == ','))
        .next()
        .unwrap_or_default()
        .split(',')
        .map(|n| n.parse().map_err(|_| invalid()))
        .collect::<io::Result<_>>()?;

    let [a, b, c, d, hi, lo] = numbers[..] else {
        return Err(invalid());
    };
    let port = u16::from(hi) << 8 | u16::from(lo);
    Ok(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(a, b, c, d), port)))
}

// == FTP Client ==
/// Logged-in FTP control connection in binary mode.
///
/// Once a reply cannot be read off the control channel the client no
/// longer knows which reply belongs to which command, so it refuses every
/// later command with [`io::ErrorKind::NotConnected`].
pub struct FtpClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    timeout: Duration,
    broken: bool,
}

impl FtpClient {
    /// Connects to `addr` and logs in.
    pub fn connect(addr: &str, user: &str, password: &str) -> io::Result<Self> {
        Self::connect_with_timeout(addr, user, password, IO_TIMEOUT)
    }

    /// Connects with a custom read timeout for control and data connections.
    pub fn connect_with_timeout(
        addr: &str,
        user: &str,
        password: &str,
        timeout: Duration,
    ) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(timeout))?;
        let writer = stream.try_clone()?;

        let mut client = Self {
            reader: BufReader::new(stream),
            writer,
            timeout,
            broken: false,
        };
        client.reply()?.require(&[220])?;

        let reply = client.command(&format!("USER {}", user))?;
        match reply.code {
            230 => {}
            331 | 332 => {
                client.command_require(&format!("PASS {}", password), &[230, 202])?;
            }
            _ => {
                reply.require(&[230])?;
            }
        }

        client.command_require("TYPE I", &[200])?;
        Ok(client)
    }

    fn send(&mut self, command: &str) -> io::Result<()> {
        if self.broken {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "FTP control connection out of sync",
            ));
        }
        let sent = self
            .writer
            .write_all(command.as_bytes())
            .and_then(|()| self.writer.write_all(b"\r\n"))
            .and_then(|()| self.writer.flush());
        if sent.is_err() {
            self.broken = true;
        }
        sent
    }

    /// Reads the next reply, poisoning the session if none can be read.
    fn reply(&mut self) -> io::Result<Reply> {
        let reply = read_reply(&mut self.reader);
        if reply.is_err() {
            self.broken = true;
        }
        reply
    }

    fn command(&mut self, command: &str) -> io::Result<Reply> {
        self.send(command)?;
        self.reply()
    }

    fn command_require(&mut self, command: &str, codes: &[u16]) -> io::Result<Reply> {
        self.command(command)?.require(codes)
    }

    /// Opens a passive data connection and issues `command` on it.
    fn open_transfer(&mut self, command: &str) -> io::Result<TcpStream> {
        let reply = self.command_require("PASV", &[227])?;
        let data = TcpStream::connect(parse_pasv(&reply.text)?)?;
        data.set_read_timeout(Some(self.timeout))?;
        self.command_require(command, &[125, 150])?;
        Ok(data)
    }

    /// Consumes the transfer's final reply, even when the data side failed,
    /// so the next command reads its own reply.
    fn finish_transfer<T>(&mut self, outcome: io::Result<T>) -> io::Result<T> {
        let reply = self.reply();
        let value = outcome?;
        reply?.require(&[226, 250])?;
        Ok(value)
    }
}

impl FtpSession for FtpClient {
    fn retrieve(&mut self, name: &str) -> io::Result<Vec<u8>> {
        let mut data = self.open_transfer(&format!("RETR {}", name))?;
        let mut buf = Vec::new();
        let received = data.read_to_end(&mut buf).map(|_| buf);
        drop(data);
        self.finish_transfer(received)
    }

    fn store(&mut self, name: &str, payload: &[u8]) -> io::Result<()> {
        let mut data = self.open_transfer(&format!("STOR {}", name))?;
        let sent = data.write_all(payload).and_then(|()| data.flush());
        drop(data);
        self.finish_transfer(sent)
    }

    fn remove(&mut self, name: &str) -> io::Result<()> {
        self.command_require(&format!("DELE {}", name), &[250])?;
        Ok(())
    }

    fn list(&mut self) -> io::Result<Vec<String>> {
        let mut data = self.open_transfer("LIST -a")?;
        let mut raw = String::new();
        let received = data.read_to_string(&mut raw).map(|_| raw);
        drop(data);
        let raw = self.finish_transfer(received)?;
        Ok(raw.lines().map(str::to_string).collect())
    }

    fn cwd(&mut self, path: &str) -> io::Result<()> {
        self.command_require(&format!("CWD {}", path), &[250])?;
        Ok(())
    }

    fn mkdir(&mut self, path: &str) -> io::Result<()> {
        self.command_require(&format!("MKD {}", path), &[257])?;
        Ok(())
    }
}

impl Drop for FtpClient {
    fn drop(&mut self) {
        let _ = self.send("QUIT");
    }
}
