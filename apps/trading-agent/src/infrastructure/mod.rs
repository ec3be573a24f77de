//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer:
//!
//! - **Inbound**: the brokerage event stream
//!   - `protocol/`: `0x01`/`0x02` wire codec and `p_cmd` classification
//!   - `dispatch/`: event dispatcher, `EC`/`FD`/`ST` handlers, ingestion loop
//!
//! - **Outbound**
//!   - `persistence/`: in-memory order and position repositories
//!   - `events/`: in-memory domain event publisher
//!   - `backtest/`: history files and the simulated trade service
//!   - `signals/`: binary strategy signal files

pub mod backtest;
pub mod dispatch;
pub mod events;
pub mod persistence;
pub mod protocol;
pub mod signals;
