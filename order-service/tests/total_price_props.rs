use chrono::Utc;
use common_money::Money;
use common_store::{MovieSession, Product};
use order_service::models::{build_order, to_response, OrderRequest, PaymentType};
use proptest::prelude::*;

proptest! {
    #[test]
    fn total_is_sum_of_products_plus_session(prices in proptest::collection::vec(0i64..100_000, 1..8), session_cents in 0i64..50_000) {
        let products: Vec<Product> = prices.iter().enumerate().map(|(i, c)| Product {
            id: format!("P{i}"), code: format!("C{i}"), name: "x".into(), price: Money::from_cents(*c), model: None, url: None,
        }).collect();
        let movie = MovieSession {
            id: "M1".into(), title: "t".into(), session: "s".into(), price: Money::from_cents(session_cents),
            category: None, poster: None, language: None, chairs: vec![],
        };
        let request = OrderRequest {
            email: "a@x.com".into(), cpf: None, client_name: None,
            products_ids: products.iter().map(|p| p.id.clone()).collect(),
            movie_id: "M1".into(), movie_chairs: vec![], payment: PaymentType::Cash,
        };
        let order = build_order(&request, &products, &movie, "o".into(), Utc::now());
        prop_assert_eq!(order.billing.total_price.as_cents(), Some(prices.iter().sum::<i64>() + session_cents));
        let resp = to_response(&order);
        prop_assert_eq!(resp.products.len(), prices.len());
        prop_assert_eq!(resp.billing, order.billing);
    }
}
