/*
Time-queue for the memory model.

A TimedServer sits between the dataflow engine and a shared resource (the backing memory) and
handles latency, bandwidth and backpressure so the engine only sees "accepted" or "rejected".

Service law:
    - every request occupies the port for ceil(size / bytes_per_cycle) cycles (bandwidth)
    - and completes base_latency cycles after its occupancy ends (pipelined latency)

When the server cannot accept more work it returns a Backpressure carrying the request back, so the
issuing processing element can simply retry on a later tick.
*/

use std::collections::VecDeque;

pub type Cycle = u64;

// Result of queueing a request with a timed server
#[derive(Debug, Clone, Copy)]
pub struct Ticket {
    issued_at: Cycle,
    ready_at: Cycle,
    size_bytes: u32,
}

impl Ticket {
    fn new(issued_at: Cycle, ready_at: Cycle, size_bytes: u32) -> Self {
        Self {
            issued_at,
            ready_at,
            size_bytes,
        }
    }

    pub fn issued_at(&self) -> Cycle {
        self.issued_at
    }

    pub fn ready_at(&self) -> Cycle {
        self.ready_at
    }

    pub fn size_bytes(&self) -> u32 {
        self.size_bytes
    }

    pub fn is_ready(&self, now: Cycle) -> bool {
        now >= self.ready_at
    }

    // Number of cycles until the ticket is ready.  Returns zero if already ready.
    pub fn remaining_cycles(&self, now: Cycle) -> Cycle {
        self.ready_at.saturating_sub(now)
    }
}

#[derive(Debug)]
pub struct ServiceRequest<T> {
    pub payload: T,
    pub size_bytes: u32,
}

impl<T> ServiceRequest<T> {
    pub fn new(payload: T, size_bytes: u32) -> Self {
        Self { payload, size_bytes }
    }
}

#[derive(Debug)]
pub struct ServiceResult<T> {
    pub payload: T,
    pub ticket: Ticket,
}

// Reasons why the server rejected a request
#[derive(Debug)]
pub enum Backpressure<T> {
    // Too many requests in flight
    QueueFull { request: ServiceRequest<T>, capacity: usize },
    // The port is still streaming a previous request
    Busy { request: ServiceRequest<T>, available_at: Cycle },
}

impl<T> Backpressure<T> {
    pub fn into_request(self) -> ServiceRequest<T> {
        match self {
            Backpressure::QueueFull { request, .. } => request,
            Backpressure::Busy { request, .. } => request,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    // Fixed latency added to every request
    pub base_latency: Cycle,
    // Throughput
    pub bytes_per_cycle: u32,
    // Maximum number of outstanding requests the server will accept
    pub queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_latency: 0,
            bytes_per_cycle: 8,
            queue_capacity: 1,
        }
    }
}

#[derive(Debug)]
struct Inflight<T> {
    payload: T,
    ticket: Ticket,
}

// Single-port pipelined server. Completion order equals issue order.
#[derive(Debug)]
pub struct TimedServer<T> {
    config: ServerConfig,
    inflight: VecDeque<Inflight<T>>,
    busy_until: Cycle,
}

impl<T> TimedServer<T> {
    pub fn new(config: ServerConfig) -> Self {
        assert!(config.bytes_per_cycle > 0, "bytes_per_cycle must be > 0");
        assert!(config.queue_capacity > 0, "queue_capacity must be > 0");
        Self {
            config,
            inflight: VecDeque::with_capacity(config.queue_capacity),
            busy_until: 0,
        }
    }

    pub fn try_enqueue(
        &mut self,
        now: Cycle,
        request: ServiceRequest<T>,
    ) -> Result<Ticket, Backpressure<T>> {
        if self.inflight.len() >= self.config.queue_capacity {
            return Err(Backpressure::QueueFull {
                request,
                capacity: self.config.queue_capacity,
            });
        }

        if self.busy_until > now {
            return Err(Backpressure::Busy {
                request,
                available_at: self.busy_until,
            });
        }

        let occupancy = ceil_div_u64(request.size_bytes as u64, self.config.bytes_per_cycle as u64);
        let ready_at = now
            .saturating_add(occupancy)
            .saturating_add(self.config.base_latency);
        let ticket = Ticket::new(now, ready_at, request.size_bytes);

        self.busy_until = now.saturating_add(occupancy);
        self.inflight.push_back(Inflight {
            payload: request.payload,
            ticket,
        });

        Ok(ticket)
    }

    // Drain any requests that have completed by "now" and invoke the callback with each result.
    pub fn service_ready<F>(&mut self, now: Cycle, mut callback: F)
    where
        F: FnMut(ServiceResult<T>),
    {
        while self.inflight.front().is_some_and(|front| front.ticket.is_ready(now)) {
            if let Some(inflight) = self.inflight.pop_front() {
                callback(ServiceResult {
                    payload: inflight.payload,
                    ticket: inflight.ticket,
                });
            }
        }
    }

    pub fn outstanding(&self) -> usize {
        self.inflight.len()
    }

    // Drop everything in flight and free the port.
    pub fn clear(&mut self) {
        self.inflight.clear();
        self.busy_until = 0;
    }
}

fn ceil_div_u64(nom: u64, denom: u64) -> Cycle {
    debug_assert!(denom > 0);
    nom.div_ceil(denom)
}
