use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse},
        categories::{CategoryList, CreateCategoryRequest},
        orders::{
            CreateOrderRequest, OrderItemRequest, OrderItemView, OrderList, OrderWithItems,
            UpdateOrderRequest,
        },
        products::{BrandList, CreateProductRequest, ProductList, UpdateProductRequest},
        promocodes::{CreatePromocodeRequest, PromocodeList},
    },
    models::{
        Category, ContactType, Order, OrderStatus, PaymentMethod, Product, Promocode, SortOrder,
    },
    response::{ApiResponse, Meta},
    routes::{auth, categories, health, orders, params, products, promocodes},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Perfume order API", description = "Storefront catalog and order management"),
    paths(
        health::health_check,
        auth::login,
        categories::list_categories,
        categories::create_category,
        categories::delete_category,
        products::list_products,
        products::list_products_admin,
        products::list_brands,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        promocodes::list_promocodes,
        promocodes::create_promocode,
        promocodes::delete_promocode,
        orders::create_order,
        orders::list_orders,
        orders::update_order,
        orders::cancel_order,
        orders::delete_order,
    ),
    components(
        schemas(
            Category,
            Product,
            Promocode,
            Order,
            PaymentMethod,
            ContactType,
            OrderStatus,
            LoginRequest,
            LoginResponse,
            CreateCategoryRequest,
            CategoryList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            BrandList,
            CreatePromocodeRequest,
            PromocodeList,
            OrderItemRequest,
            CreateOrderRequest,
            UpdateOrderRequest,
            OrderItemView,
            OrderWithItems,
            OrderList,
            SortOrder,
            params::ProductSortBy,
            health::HealthData,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<BrandList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Admin authentication"),
        (name = "Categories", description = "Catalog categories"),
        (name = "Products", description = "Catalog products"),
        (name = "Promocodes", description = "Promotional codes"),
        (name = "Orders", description = "Order placement and management"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_order_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/orders"));
        assert!(doc.paths.paths.contains_key("/api/orders/{id}/cancel"));
        assert!(doc.paths.paths.contains_key("/api/products/brands"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
