/// Fan-out relay (C8, external collaborator): every record C3 settles is
/// tee'd onto a broadcast channel and pushed to connected browser clients
/// over a WebSocket. No persistence, no replay-on-reconnect, no auth.
use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tokio::sync::broadcast;
use transactional_outbox::RelayRecord;

#[derive(Message, Clone)]
#[rtype(result = "()")]
struct Forward(RelayRecord);

pub struct WsRelayActor {
    receiver: Option<broadcast::Receiver<RelayRecord>>,
}

impl WsRelayActor {
    pub fn new(receiver: broadcast::Receiver<RelayRecord>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }
}

impl Actor for WsRelayActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let addr = ctx.address();
        let mut receiver = self
            .receiver
            .take()
            .expect("WsRelayActor started exactly once");

        actix::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(record) => addr.do_send(Forward(record)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsRelayActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            // This is a server -> client-only stream; ignore anything a
            // client sends.
            _ => {}
        }
    }
}

impl Handler<Forward> for WsRelayActor {
    type Result = ();

    fn handle(&mut self, msg: Forward, ctx: &mut Self::Context) {
        let record = msg.0;
        let body = serde_json::json!({
            "topic": record.topic,
            "raw_payload": record.raw_payload,
        });
        match serde_json::to_string(&body) {
            Ok(json) => ctx.text(json),
            Err(e) => tracing::error!("failed to serialize relay record: {}", e),
        }
    }
}

/// `GET /ws`
pub async fn ws_relay(
    req: HttpRequest,
    stream: web::Payload,
    relay: web::Data<broadcast::Sender<RelayRecord>>,
) -> actix_web::Result<HttpResponse> {
    let actor = WsRelayActor::new(relay.subscribe());
    ws::start(actor, &req, stream)
}
