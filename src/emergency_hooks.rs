//! Wires [`ferrotrade_risk::EmergencyStopHooks`] to the per-user Order Routers, the shared
//! Portfolio Store and the bot registry — the control plane is "the natural implementor" per
//! that trait's own doc comment, since it's the only thing holding all three.

use async_trait::async_trait;
use ferrotrade_exchange::model::{OrderType, Side as ExchangeSide};
use ferrotrade_execution::NewOrderRequest;
use ferrotrade_integration::Id;
use ferrotrade_portfolio::PositionSide;
use ferrotrade_risk::EmergencyStopHooks;
use ferrotrade_strategy::{BotCommand, RuntimeEvent};
use std::sync::Arc;
use tracing::warn;

use crate::control_plane::Inner;

pub struct ControlPlaneEmergencyHooks {
    pub(crate) inner: Arc<Inner>,
}

#[async_trait]
impl EmergencyStopHooks for ControlPlaneEmergencyHooks {
    async fn cancel_all_open_orders(&self, user: Id) -> usize {
        let Some(router) = self.inner.routers.lock().get(&user).cloned() else {
            return 0;
        };
        let open = router.open_orders(user, None);
        let mut canceled = 0;
        for order in open {
            match router.cancel_order(order.id).await {
                Ok(()) => canceled += 1,
                Err(err) => warn!(%user, order_id = %order.id, %err, "failed to cancel order during emergency stop"),
            }
        }
        canceled
    }

    async fn close_all_positions_reduce_only(&self, user: Id) -> usize {
        let Some(router) = self.inner.routers.lock().get(&user).cloned() else {
            return 0;
        };
        let positions = self.inner.portfolio.open_positions(user);
        let mut closed = 0;
        for position in positions {
            let reference_price = self
                .inner
                .market_data
                .reference_price(&position.symbol)
                .unwrap_or(position.mark_price);
            let side = match position.side {
                PositionSide::Long => ExchangeSide::Sell,
                PositionSide::Short => ExchangeSide::Buy,
            };
            let request = NewOrderRequest {
                symbol: position.symbol.clone(),
                side,
                order_type: OrderType::Market,
                time_in_force: None,
                quantity: position.quantity,
                price: None,
                reduce_only: true,
                reference_price,
            };
            match router.place_order(user, request).await {
                Ok(_) => closed += 1,
                Err(err) => warn!(%user, symbol = %position.symbol, %err, "failed to close position during emergency stop"),
            }
        }
        closed
    }

    async fn stop_all_bots(&self, user: Id) -> usize {
        let handles = self.inner.bot_handles.lock();
        let mut stopped = 0;
        for (bot_id, handle) in handles.iter() {
            if self.inner.bots.get_owned(*bot_id, user).is_some() {
                handle.send(RuntimeEvent::Command(BotCommand::Stop));
                stopped += 1;
            }
        }
        stopped
    }
}
