pub mod message_router;
