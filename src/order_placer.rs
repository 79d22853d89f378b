//! Adapts a concrete [`ferrotrade_execution::OrderRouter`] to the Bot Runtime's [`OrderPlacer`]
//! seam, so `ferrotrade-strategy` never needs the router's generic parameters in scope.

use async_trait::async_trait;
use ferrotrade_execution::NewOrderRequest;
use ferrotrade_integration::Id;
use ferrotrade_strategy::OrderPlacer;
use std::sync::Arc;

use crate::control_plane::UserRouter;

pub struct RouterOrderPlacer {
    router: Arc<UserRouter>,
}

impl RouterOrderPlacer {
    pub fn new(router: Arc<UserRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl OrderPlacer for RouterOrderPlacer {
    async fn place_order(&self, user: Id, request: NewOrderRequest) -> Result<Id, String> {
        self.router.place_order(user, request).await.map_err(|err| err.to_string())
    }

    async fn cancel_order(&self, order_id: Id) -> Result<(), String> {
        self.router.cancel_order(order_id).await.map_err(|err| err.to_string())
    }
}
