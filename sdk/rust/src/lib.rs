//! Client for the Stacks Guestbook HTTP API.

pub mod client;

pub use client::{
    GuestbookClient, Message, MessageList, SdkError, SdkResult, Session, Status, Tip, Tips,
    TxReceipt,
};
