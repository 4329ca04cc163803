//! Text block describing the cached data, sent along with each question

use crate::analytics::{BucketStats, SalesAggregation, TOP_PRODUCTS};
use crate::report::{format_count, format_currency};
use itertools::Itertools;

/// Upper bound on the context block, in characters
pub const MAX_CONTEXT_CHARS: usize = 4_000;

const TRUNCATION_MARK: &str = "\n[...]";

pub fn build_context(agg: &SalesAggregation, last_update: Option<&str>) -> String {
    let block = format!(
        "RESUMO GERAL:\n\
         - Total de transações: {records}\n\
         - Receita total: {revenue}\n\
         - Ticket médio: {ticket}\n\
         - Última atualização: {updated}\n\
         \n\
         TOP PRODUTOS POR RECEITA:\n{products}\n\
         \n\
         TOP REGIÕES POR RECEITA:\n{regions}\n\
         \n\
         TOP CATEGORIAS POR RECEITA:\n{categories}\n\
         \n\
         TOP VENDEDORES POR RECEITA:\n{sellers}\n\
         \n\
         DADOS DETALHADOS DISPONÍVEIS:\n\
         - {n_products} produtos únicos\n\
         - {n_regions} regiões ativas\n\
         - {n_categories} categorias\n\
         - {n_sellers} vendedores\n\
         - {n_customers} clientes",
        records = format_count(agg.total_records),
        revenue = format_currency(agg.total_revenue),
        ticket = format_currency(agg.average_ticket()),
        updated = last_update.unwrap_or("N/A"),
        products = list(&agg.top_products(TOP_PRODUCTS)),
        regions = list(&agg.top_regions()),
        categories = list(&agg.top_categories()),
        sellers = list(&agg.top_sellers()),
        n_products = agg.by_product.len(),
        n_regions = agg.by_region.len(),
        n_categories = agg.by_category.len(),
        n_sellers = agg.by_seller.len(),
        n_customers = agg.distinct_customers,
    );
    truncate_chars(block, MAX_CONTEXT_CHARS)
}

/// User prompt wrapping the context block and the question
pub fn build_prompt(context: &str, message: &str) -> String {
    format!(
        "DADOS DISPONÍVEIS:\n{}\n\n\
         PERGUNTA DO USUÁRIO: {}\n\n\
         INSTRUÇÕES:\n\
         - Responda em português brasileiro\n\
         - Use os dados fornecidos para dar insights específicos\n\
         - Seja preciso e baseado nos dados reais\n\
         - Use formatação Markdown para organizar a resposta\n\
         - Inclua números específicos quando relevante\n\
         - Sugira ações práticas baseadas nos dados\n\n\
         RESPONDA:",
        context, message
    )
}

fn list(buckets: &[BucketStats]) -> String {
    if buckets.is_empty() {
        return "- sem dados".to_string();
    }
    buckets
        .iter()
        .map(|b| format!("- {}: {} vendas, {}", b.key, b.count, format_currency(b.revenue)))
        .join("\n")
}

fn truncate_chars(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        return text;
    }
    let keep = max.saturating_sub(TRUNCATION_MARK.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARK);
    out
}
