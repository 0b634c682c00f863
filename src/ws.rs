use actix::{Actor, ActorContext, AsyncContext, Handler, Message, Recipient};
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_web_actors::ws;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::AppState;
use crate::notify::{ChannelLayer, ORDERS_TOPIC};

static NEXT_SESSION_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Message)]
#[rtype(result = "()")]
pub struct WsMessage(pub String);

#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub session_id: usize,
    pub addr: Recipient<WsMessage>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub session_id: usize,
}

/// Fan a text frame out to every connected kitchen display.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Broadcast(pub String);

pub struct OrdersHub {
    sessions: HashMap<usize, Recipient<WsMessage>>,
}

impl OrdersHub {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }
}

impl Default for OrdersHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for OrdersHub {
    type Context = actix::Context<Self>;
}

impl Handler<Connect> for OrdersHub {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Self::Context) -> Self::Result {
        self.sessions.insert(msg.session_id, msg.addr);
    }
}

impl Handler<Disconnect> for OrdersHub {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Self::Context) -> Self::Result {
        self.sessions.remove(&msg.session_id);
    }
}

impl Handler<Broadcast> for OrdersHub {
    type Result = ();

    fn handle(&mut self, msg: Broadcast, _: &mut Self::Context) -> Self::Result {
        for addr in self.sessions.values() {
            addr.do_send(WsMessage(msg.0.clone()));
        }
    }
}

/// In-process channel layer: publishes land on the hub, which owns the
/// WebSocket sessions.
pub struct HubChannel {
    hub: actix::Addr<OrdersHub>,
}

impl HubChannel {
    pub fn new(hub: actix::Addr<OrdersHub>) -> Self {
        Self { hub }
    }
}

impl ChannelLayer for HubChannel {
    fn publish(&self, topic: &str, payload: String) {
        // One group today; the topic argument keeps the seam honest.
        if topic == ORDERS_TOPIC {
            self.hub.do_send(Broadcast(payload));
        }
    }
}

struct OrdersSession {
    session_id: usize,
    hub: actix::Addr<OrdersHub>,
}

impl OrdersSession {
    fn new(hub: actix::Addr<OrdersHub>) -> Self {
        Self {
            session_id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            hub,
        }
    }
}

impl Actor for OrdersSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hub.do_send(Connect {
            session_id: self.session_id,
            addr: ctx.address().recipient(),
        });
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        self.hub.do_send(Disconnect {
            session_id: self.session_id,
        });
    }
}

impl Handler<WsMessage> for OrdersSession {
    type Result = ();

    fn handle(&mut self, msg: WsMessage, ctx: &mut Self::Context) -> Self::Result {
        ctx.text(msg.0);
    }
}

impl actix::StreamHandler<Result<ws::Message, ws::ProtocolError>> for OrdersSession {
    fn handle(&mut self, item: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match item {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            // The socket is push-only; client frames carry nothing.
            Ok(ws::Message::Text(_)) => {}
            Ok(ws::Message::Binary(_)) => {}
            Ok(ws::Message::Continuation(_)) => {}
            Ok(ws::Message::Nop) => {}
            Err(_) => ctx.stop(),
        }
    }
}

/// Kitchen displays subscribe here. No auth at this layer; the socket
/// only ever pushes order payloads outward.
pub async fn orders_ws(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    ws::start(OrdersSession::new(state.hub.clone()), &req, stream)
}
