//! Integration tests: full scan, refresh and bet cycles wired the way the
//! binary wires them, against an in-memory backend and a fake HTTP service.

mod http_backend;
mod scan_cycle;
