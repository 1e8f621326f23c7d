//! Raw GraphQL documents for the Admin API.
//!
//! The response shapes are consumed as untyped JSON by the ingestion
//! normalizer, so these documents only pin down which fields we ask for.

/// Shared selection for the code-discount union members.
const CODE_DISCOUNT_FIELDS: &str = r"
fragment CodeDiscountFields on DiscountCode {
  ... on DiscountCodeBasic {
    __typename
    title
    summary
    status
    startsAt
    endsAt
    usageLimit
    asyncUsageCount
    appliesOncePerCustomer
    codesCount { count }
    codes(first: 25) { nodes { code } }
    customerSelection {
      __typename
      ... on DiscountCustomerAll { allCustomers }
      ... on DiscountCustomerSegments { segments { id name } }
    }
    combinesWith {
      orderDiscounts
      productDiscounts
      shippingDiscounts
    }
    customerGets {
      value {
        ... on DiscountAmount { amount { amount currencyCode } }
        ... on DiscountPercentage { percentage }
      }
      items {
        ... on DiscountProducts {
          products(first: 50) { nodes { id } }
        }
        ... on DiscountCollections {
          collections(first: 50) { nodes { id } }
        }
      }
    }
    minimumRequirement {
      ... on DiscountMinimumSubtotal { greaterThanOrEqualToSubtotal { amount } }
      ... on DiscountMinimumQuantity { greaterThanOrEqualToQuantity }
    }
  }
  ... on DiscountCodeBxgy {
    __typename
    title
    summary
    status
    startsAt
    endsAt
    usageLimit
    asyncUsageCount
    appliesOncePerCustomer
    codesCount { count }
    codes(first: 25) { nodes { code } }
    combinesWith {
      orderDiscounts
      productDiscounts
      shippingDiscounts
    }
    customerBuys {
      value {
        ... on DiscountQuantity { quantity }
        ... on DiscountPurchaseAmount { amount }
      }
    }
    customerGets {
      value {
        ... on DiscountOnQuantity {
          quantity { quantity }
          effect {
            ... on DiscountPercentage { percentage }
          }
        }
      }
    }
  }
  ... on DiscountCodeFreeShipping {
    __typename
    title
    summary
    status
    startsAt
    endsAt
    usageLimit
    asyncUsageCount
    appliesOncePerCustomer
    codesCount { count }
    codes(first: 25) { nodes { code } }
    customerSelection {
      __typename
      ... on DiscountCustomerAll { allCustomers }
      ... on DiscountCustomerSegments { segments { id name } }
    }
    combinesWith {
      orderDiscounts
      productDiscounts
      shippingDiscounts
    }
    destinationSelection {
      ... on DiscountCountries { countries }
    }
    minimumRequirement {
      ... on DiscountMinimumSubtotal { greaterThanOrEqualToSubtotal { amount } }
      ... on DiscountMinimumQuantity { greaterThanOrEqualToQuantity }
    }
  }
  ... on DiscountCodeApp {
    __typename
    title
    status
    startsAt
    endsAt
    usageLimit
    asyncUsageCount
    appliesOncePerCustomer
    codesCount { count }
    codes(first: 25) { nodes { code } }
    combinesWith {
      orderDiscounts
      productDiscounts
      shippingDiscounts
    }
  }
}
";

/// Shared selection for the automatic-discount union members.
const AUTOMATIC_DISCOUNT_FIELDS: &str = r"
fragment AutomaticDiscountFields on DiscountAutomatic {
  ... on DiscountAutomaticBasic {
    __typename
    title
    summary
    status
    startsAt
    endsAt
    asyncUsageCount
    customerSelection {
      __typename
      ... on DiscountCustomerAll { allCustomers }
      ... on DiscountCustomerSegments { segments { id name } }
    }
    combinesWith {
      orderDiscounts
      productDiscounts
      shippingDiscounts
    }
    customerGets {
      value {
        ... on DiscountAmount { amount { amount currencyCode } }
        ... on DiscountPercentage { percentage }
      }
      items {
        ... on DiscountProducts {
          products(first: 50) { nodes { id } }
        }
        ... on DiscountCollections {
          collections(first: 50) { nodes { id } }
        }
      }
    }
    minimumRequirement {
      ... on DiscountMinimumSubtotal { greaterThanOrEqualToSubtotal { amount } }
      ... on DiscountMinimumQuantity { greaterThanOrEqualToQuantity }
    }
  }
  ... on DiscountAutomaticBxgy {
    __typename
    title
    summary
    status
    startsAt
    endsAt
    asyncUsageCount
    combinesWith {
      orderDiscounts
      productDiscounts
      shippingDiscounts
    }
    customerBuys {
      value {
        ... on DiscountQuantity { quantity }
        ... on DiscountPurchaseAmount { amount }
      }
    }
  }
  ... on DiscountAutomaticFreeShipping {
    __typename
    title
    summary
    status
    startsAt
    endsAt
    asyncUsageCount
    customerSelection {
      __typename
      ... on DiscountCustomerAll { allCustomers }
      ... on DiscountCustomerSegments { segments { id name } }
    }
    combinesWith {
      orderDiscounts
      productDiscounts
      shippingDiscounts
    }
    destinationSelection {
      ... on DiscountCountries { countries }
    }
    minimumRequirement {
      ... on DiscountMinimumSubtotal { greaterThanOrEqualToSubtotal { amount } }
      ... on DiscountMinimumQuantity { greaterThanOrEqualToQuantity }
    }
  }
  ... on DiscountAutomaticApp {
    __typename
    title
    status
    startsAt
    endsAt
    asyncUsageCount
    combinesWith {
      orderDiscounts
      productDiscounts
      shippingDiscounts
    }
  }
}
";

/// Fetch a single discount node by GID. Used when a sparse REST webhook
/// payload needs enrichment before normalization.
#[must_use]
pub fn discount_node() -> String {
    format!(
        r"
query DiscountNode($id: ID!) {{
  node(id: $id) {{
    id
    ... on DiscountCodeNode {{
      codeDiscount {{ ...CodeDiscountFields }}
    }}
    ... on DiscountAutomaticNode {{
      automaticDiscount {{ ...AutomaticDiscountFields }}
    }}
  }}
}}
{CODE_DISCOUNT_FIELDS}
{AUTOMATIC_DISCOUNT_FIELDS}"
    )
}

/// Fetch a single order node by GID, for enriching REST webhook payloads
/// whose discount applications lack type discriminators.
pub const ORDER_NODE: &str = r"
query OrderNode($id: ID!) {
  node(id: $id) {
    __typename
    id
    ... on Order {
      discountApplications(first: 10) {
        nodes {
          __typename
          ... on DiscountCodeApplication { code }
          ... on AutomaticDiscountApplication { title }
          ... on ManualDiscountApplication { title description }
          ... on ScriptDiscountApplication { title }
          allocationMethod
          targetSelection
          targetType
          value {
            ... on MoneyV2 { amount currencyCode }
            ... on PricingPercentageValue { percentage }
          }
        }
      }
      lineItems(first: 50) {
        nodes {
          id
          discountAllocations {
            allocatedAmountSet { shopMoney { amount } }
            discountApplication {
              __typename
              ... on DiscountCodeApplication { code }
              ... on AutomaticDiscountApplication { title }
            }
          }
        }
      }
    }
  }
}
";

/// One page of historical orders, oldest first within the query window.
pub const ORDERS_PAGE: &str = r"
query OrdersPage($first: Int!, $after: String, $query: String) {
  orders(first: $first, after: $after, query: $query, sortKey: CREATED_AT) {
    nodes {
      id
      name
      createdAt
      updatedAt
      processedAt
      cancelledAt
      displayFinancialStatus
      displayFulfillmentStatus
      email
      sourceName
      app { id }
      customer { id }
      currencyCode
      totalPriceSet { shopMoney { amount currencyCode } }
      subtotalPriceSet { shopMoney { amount currencyCode } }
      totalDiscountsSet { shopMoney { amount currencyCode } }
      totalTaxSet { shopMoney { amount currencyCode } }
      discountCodes
      discountApplications(first: 10) {
        nodes {
          __typename
          ... on DiscountCodeApplication { code }
          ... on AutomaticDiscountApplication { title }
          ... on ManualDiscountApplication { title description }
          ... on ScriptDiscountApplication { title }
          allocationMethod
          targetSelection
          targetType
          value {
            ... on MoneyV2 { amount currencyCode }
            ... on PricingPercentageValue { percentage }
          }
        }
      }
      lineItems(first: 50) {
        nodes {
          id
          title
          quantity
          discountedTotalSet { shopMoney { amount } }
          discountAllocations {
            allocatedAmountSet { shopMoney { amount } }
            discountApplication {
              __typename
              ... on DiscountCodeApplication { code }
              ... on AutomaticDiscountApplication { title }
            }
          }
        }
      }
    }
    pageInfo {
      hasNextPage
      endCursor
    }
  }
}
";

/// One page of code discounts.
#[must_use]
pub fn code_discounts_page() -> String {
    format!(
        r"
query CodeDiscountsPage($first: Int!, $after: String, $query: String) {{
  codeDiscountNodes(first: $first, after: $after, query: $query) {{
    nodes {{
      id
      codeDiscount {{ ...CodeDiscountFields }}
    }}
    pageInfo {{
      hasNextPage
      endCursor
    }}
  }}
}}
{CODE_DISCOUNT_FIELDS}"
    )
}

/// One page of automatic discounts.
#[must_use]
pub fn automatic_discounts_page() -> String {
    format!(
        r"
query AutomaticDiscountsPage($first: Int!, $after: String, $query: String) {{
  automaticDiscountNodes(first: $first, after: $after, query: $query) {{
    nodes {{
      id
      automaticDiscount {{ ...AutomaticDiscountFields }}
    }}
    pageInfo {{
      hasNextPage
      endCursor
    }}
  }}
}}
{AUTOMATIC_DISCOUNT_FIELDS}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_node_includes_both_unions() {
        let doc = discount_node();
        assert!(doc.contains("DiscountCodeNode"));
        assert!(doc.contains("DiscountAutomaticNode"));
        assert!(doc.contains("fragment CodeDiscountFields"));
        assert!(doc.contains("fragment AutomaticDiscountFields"));
    }

    #[test]
    fn test_discount_fragments_request_customer_selection() {
        for doc in [
            discount_node(),
            code_discounts_page(),
            automatic_discounts_page(),
        ] {
            assert!(doc.contains("customerSelection"));
            assert!(doc.contains("DiscountCustomerSegments"));
        }
    }

    #[test]
    fn test_code_fragments_request_full_code_list() {
        let doc = code_discounts_page();
        assert!(doc.contains("codes(first: 25)"));
        assert!(!doc.contains("codes(first: 1)"));
    }

    #[test]
    fn test_orders_page_sorts_by_created_at() {
        assert!(ORDERS_PAGE.contains("sortKey: CREATED_AT"));
        assert!(ORDERS_PAGE.contains("discountApplications"));
    }
}
