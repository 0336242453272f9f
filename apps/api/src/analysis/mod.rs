// Analysis orchestration: external scorer client, history recording, the
// request pipeline and its HTTP handlers.

pub mod handlers;
pub mod history;
pub mod pipeline;
pub mod scorer;
