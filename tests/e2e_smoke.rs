// tests/e2e_smoke.rs

use std::sync::Arc;

use fairkauf_matcher::{
    Candidate, Grade, MatcherConfig, MemoryCatalog, ShoppingListItem, SuggestionPipeline,
    SuggestionRequest,
};

fn pipeline_with(pool: Vec<Candidate>) -> SuggestionPipeline {
    SuggestionPipeline::new(MatcherConfig::default())
        .with_local_catalog(Arc::new(MemoryCatalog::new(pool)))
}

#[tokio::test]
async fn smoke_list_entry_to_purchase_plan() {
    // A list entry "milch, 2l" against a small store catalog
    let pipeline = pipeline_with(vec![
        Candidate::new("Frische Vollmilch")
            .with_quantity_text("1l")
            .with_price(1.09)
            .with_grades(Some(Grade::A), Some(Grade::B)),
        Candidate::new("Haferdrink Classic").with_quantity_text("1l"),
    ]);

    let mut item = ShoppingListItem::new("milch").with_quantity("2l");
    let suggestions = pipeline
        .find_suggestions(&SuggestionRequest::new(&item.text))
        .await
        .unwrap();
    assert!(!suggestions.is_empty());

    // The graded product wins the ranking; bind it and resolve the quantity
    let top = suggestions[0].candidate.clone();
    assert_eq!(top.name, "Frische Vollmilch");
    item.bind(top);

    let bound = item.bound.as_ref().unwrap();
    let plan = bound.purchase.unwrap();
    assert_eq!(plan.count, 2, "two 1l packs cover 2l");
    assert_eq!(plan.total_display(), "2.00 L");
}

#[tokio::test]
async fn smoke_comma_decimals_and_piece_goods() {
    let pipeline = pipeline_with(vec![
        Candidate::new("Weizenmehl Type 405").with_quantity_text("500g"),
        Candidate::new("Bio Eier 10er").with_quantity_text("10er"),
    ]);

    // German decimal comma in the needed amount
    let mut flour = ShoppingListItem::new("mehl").with_quantity("1,5kg");
    let suggestions = pipeline
        .find_suggestions(&SuggestionRequest::new(&flour.text))
        .await
        .unwrap();
    assert_eq!(suggestions[0].candidate.name, "Weizenmehl Type 405");

    flour.bind(suggestions[0].candidate.clone());
    let plan = flour.bound.as_ref().unwrap().purchase.unwrap();
    assert_eq!(plan.count, 3);
    assert_eq!(plan.total_display(), "1.50 kg");

    // Piece goods have no parsable pack size; the binding survives without a plan
    let mut eggs = ShoppingListItem::new("eier").with_quantity("10");
    let suggestions = pipeline
        .find_suggestions(&SuggestionRequest::new(&eggs.text))
        .await
        .unwrap();
    assert_eq!(suggestions[0].candidate.name, "Bio Eier 10er");

    eggs.bind(suggestions[0].candidate.clone());
    let bound = eggs.bound.as_ref().unwrap();
    assert!(bound.purchase.is_none());

    eggs.unbind();
    assert!(eggs.bound.is_none());
}
