// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Minimal outlet used to drive inlet sessions from tests

#![allow(dead_code)]

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::io::{BufWriter, ErrorKind, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use streamsense_transports::prelude::*;
use streamsense_types::{ChannelFormat, StreamDescriptor, StreamInfo};

pub struct FakeOutlet {
    pub descriptor: StreamDescriptor,
    responder: DiscoveryResponder,
    frames: Option<Sender<DataFrame>>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl FakeOutlet {
    /// Advertise `uid` on `port_base` and serve consumers one at a time
    pub fn start(uid: &str, channel_count: usize, port_base: u16) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let port = listener.local_addr().unwrap().port();

        let descriptor = StreamDescriptor::new(
            uid,
            StreamInfo::new("TestStream", "EEG", channel_count, 100.0, ChannelFormat::Double64, "test"),
            "localhost",
            "0.0.0.0",
            port,
        );

        let mut responder = DiscoveryResponder::bind(descriptor.clone(), port_base, 4).unwrap();
        responder.start().unwrap();

        let (frames_tx, frames_rx) = channel::unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let thread = {
            let descriptor = descriptor.clone();
            let stop = Arc::clone(&stop);
            thread::spawn(move || serve(listener, descriptor, frames_rx, stop))
        };

        Self {
            descriptor: descriptor.with_data_host("127.0.0.1"),
            responder,
            frames: Some(frames_tx),
            stop,
            thread: Some(thread),
        }
    }

    pub fn send(&self, frame: DataFrame) {
        if let Some(frames) = &self.frames {
            frames.send(frame).unwrap();
        }
    }

    pub fn send_sample(&self, timestamp: f64, values: Vec<f64>) {
        self.send(DataFrame::Sample { timestamp, values });
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.frames.take();
        let _ = self.responder.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for FakeOutlet {
    fn drop(&mut self) {
        self.stop();
    }
}

fn serve(
    listener: TcpListener,
    descriptor: StreamDescriptor,
    frames: Receiver<DataFrame>,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::Acquire) {
        let mut stream = match listener.accept() {
            Ok((stream, _)) => stream,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
                continue;
            }
            Err(_) => return,
        };
        stream.set_nonblocking(false).unwrap();
        let codec = match accept_data_channel(&mut stream, &descriptor, Duration::from_secs(2)) {
            Ok(Some(codec)) => codec,
            _ => continue,
        };

        let mut writer = BufWriter::new(stream);
        loop {
            match frames.recv_timeout(Duration::from_millis(20)) {
                Ok(frame) => {
                    if codec.write_frame(&mut writer, &frame).is_err() || writer.flush().is_err() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) if !stop.load(Ordering::Acquire) => {}
                _ => return,
            }
        }
    }
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
