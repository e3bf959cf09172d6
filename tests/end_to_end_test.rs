// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of LindaSpaces.
//
// LindaSpaces is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// LindaSpaces is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with LindaSpaces. If not, see <https://www.gnu.org/licenses/>.


//! End-to-end tests through the `lindaspaces` facade
//!
//! Exercises the engine the way applications combine it: a master/worker
//! pipeline over plain threads, async tasks sharing the space with threads,
//! chat channels living next to application tuples, and a space built from a
//! configuration file.

use anyhow::Result;
use lindaspaces::chat::ChatServer;
use lindaspaces::tracing_setup::init_test_tracing;
use lindaspaces::tuplespace::provider::TupleSpaceProvider;
use lindaspaces::tuplespace::WakePolicy;
use lindaspaces::{pattern, tuple, TupleSpace};
use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

const LONG: Duration = Duration::from_secs(10);

#[test]
fn test_master_worker_pipeline() -> Result<()> {
    init_test_tracing();
    const WORKERS: usize = 4;
    const TASKS: u64 = 50;

    let space = TupleSpace::new();
    let workers: Vec<_> = (0..WORKERS)
        .map(|_| {
            let space = space.clone();
            thread::spawn(move || -> Result<usize> {
                let mut done = 0;
                loop {
                    let task = space.consume(&pattern!("task", _))?;
                    let Some(n) = task.field(1).and_then(|n| n.parse::<u64>().ok()) else {
                        // Poison pill
                        return Ok(done);
                    };
                    space.insert(tuple!("result", n.to_string(), (n * n).to_string()))?;
                    done += 1;
                }
            })
        })
        .collect();

    for n in 0..TASKS {
        space.insert(tuple!("task", n.to_string()))?;
    }

    let mut sum = 0;
    for _ in 0..TASKS {
        let result = space
            .consume_timeout(&pattern!("result", _, _), LONG)?
            .expect("worker pipeline stalled");
        sum += result.field(2).unwrap_or("0").parse::<u64>()?;
    }
    assert_eq!(sum, (0..TASKS).map(|n| n * n).sum::<u64>());

    for _ in 0..WORKERS {
        space.insert(tuple!("task", "stop"))?;
    }
    let processed: usize = workers
        .into_iter()
        .map(|worker| worker.join().expect("worker panicked"))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .sum();
    assert_eq!(processed as u64, TASKS);
    assert!(space.is_empty());
    Ok(())
}

#[test]
fn test_chat_shares_space_with_application_tuples() -> Result<()> {
    init_test_tracing();
    let space = TupleSpace::new();
    space.insert(tuple!("lobby", "topic", "rust"))?;

    ChatServer::bootstrap(&space)?;
    let server = ChatServer::new(space.clone(), 2, &["lobby"])?;
    let mut listener = server.open_connection("lobby")?;
    server.write_message("lobby", "hello")?;
    assert_eq!(listener.next_message()?, "hello");
    listener.close()?;

    // Arity keeps the chat state and the application tuple apart.
    assert_eq!(
        space.try_peek(&pattern!("lobby", "topic", _))?,
        Some(tuple!("lobby", "topic", "rust"))
    );
    assert_eq!(space.count(&pattern!("lobby", _, _)), 2);
    assert!(space
        .snapshot()
        .contains(&tuple!("lobby", "msg", "0", "hello")));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_tasks_and_threads_coordinate() -> Result<()> {
    init_test_tracing();
    let space = TupleSpace::new();

    let replies = tokio::spawn({
        let space = space.clone();
        async move {
            let mut replies = Vec::new();
            for _ in 0..3 {
                let reply = TupleSpaceProvider::consume(&space, &pattern!("reply", _)).await?;
                replies.push(reply);
            }
            Ok::<_, anyhow::Error>(replies)
        }
    });

    let responder = {
        let space = space.clone();
        thread::spawn(move || -> Result<()> {
            for _ in 0..3 {
                let request = space.consume(&pattern!("request", _))?;
                let id = request.field(1).unwrap_or_default().to_string();
                space.insert(tuple!("reply", id))?;
            }
            Ok(())
        })
    };

    for id in ["a", "b", "c"] {
        space.write(tuple!("request", id)).await?;
    }

    let mut replies = tokio::time::timeout(LONG, replies).await???;
    replies.sort();
    assert_eq!(
        replies,
        vec![tuple!("reply", "a"), tuple!("reply", "b"), tuple!("reply", "c")]
    );
    responder.join().expect("responder panicked")?;
    Ok(())
}

#[test]
fn test_space_from_config_file() -> Result<()> {
    init_test_tracing();
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
    writeln!(file, "name: configured\nwake_policy: single\nrecheck_interval_ms: 25")?;

    let space = TupleSpace::from_file(file.path())?;
    assert_eq!(space.name(), "configured");
    assert_eq!(space.wake_policy(), WakePolicy::Single);

    let waiter = {
        let space = space.clone();
        thread::spawn(move || space.peek_timeout(&pattern!("ready"), LONG))
    };
    let deadline = Instant::now() + LONG;
    while space.waiting_patterns().is_empty() {
        assert!(Instant::now() < deadline, "waiter never blocked");
        thread::sleep(Duration::from_millis(1));
    }
    space.insert(tuple!("ready"))?;
    assert_eq!(waiter.join().expect("waiter panicked")?, Some(tuple!("ready")));
    Ok(())
}
