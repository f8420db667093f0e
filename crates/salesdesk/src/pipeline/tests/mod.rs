mod common;
mod handover;
