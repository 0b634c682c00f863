use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::products::list_products,
        crate::api::public_orders::create_public_order,
        crate::api::public_orders::active_order_count,
        crate::api::staff_orders::list_orders,
        crate::api::staff_orders::update_order_status,
        crate::api::webpay::webpay_init
    ),
    components(
        schemas(
            crate::models::Product,
            crate::models::OrderDetail,
            crate::models::OrderItemDetail,
            crate::models::OrderStatus,
            crate::models::PaymentMethod,
            crate::models::PaymentStatus,
            crate::orders::CartRequest,
            crate::orders::CartItem,
            crate::orders::FieldError,
            crate::api::staff_orders::StatusChangeRequest
        )
    ),
    tags(
        (name = "public", description = "Storefront: menu and checkout"),
        (name = "staff", description = "Kitchen order board"),
        (name = "payments", description = "Webpay Plus card flow")
    )
)]
pub struct ApiDoc;
