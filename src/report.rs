//! Report Renderer
//!
//! Deterministic Markdown analysis of an aggregation. Output depends only on
//! the aggregation and the metadata passed in; the clock is never read here.

use crate::analytics::{BucketStats, SalesAggregation, TOP_PRODUCTS};
use chrono::{DateTime, Local};
use std::fmt::{self, Write};

pub const NO_DATA_REPORT: &str = "Nenhum dado disponível para análise.";
pub const NOT_AVAILABLE: &str = "N/A";

/// Context that is not part of the aggregation itself
#[derive(Debug, Clone)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Local>,
    /// Label of the last successful refresh, if any
    pub last_update: Option<String>,
    pub source: String,
}

impl ReportMetadata {
    pub fn new(generated_at: DateTime<Local>, last_update: Option<String>) -> Self {
        Self {
            generated_at,
            last_update,
            source: "Planilha de vendas integrada".to_string(),
        }
    }
}

/// `1234.5` -> `"1,234.50"`
pub fn format_decimal(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

pub fn format_currency(value: f64) -> String {
    format!("R$ {}", format_decimal(value, 2))
}

pub fn format_count(value: usize) -> String {
    format_decimal(value as f64, 0)
}

/// Full analysis with the fixed section headings
pub fn render(agg: &SalesAggregation, meta: &ReportMetadata) -> String {
    if agg.is_empty() {
        return NO_DATA_REPORT.to_string();
    }

    let mut out = String::new();
    // fmt::Write for String never fails
    let _ = write_report(&mut out, agg, meta);
    out
}

fn write_report(out: &mut String, agg: &SalesAggregation, meta: &ReportMetadata) -> fmt::Result {
    let total = agg.total_revenue;

    writeln!(out, "# Principais Insights de Vendas - Análise Detalhada\n")?;

    writeln!(out, "## Identificação de tendências de vendas")?;
    writeln!(out, "**Dados analisados**: {} transações processadas", format_count(agg.total_records))?;
    writeln!(out, "**Receita total**: {}", format_currency(total))?;
    writeln!(out, "**Ticket médio**: {}\n", format_currency(agg.average_ticket()))?;
    writeln!(out, "### Performance por Mês (Últimos 3 meses):")?;
    let months = agg.recent_months(3);
    if months.is_empty() {
        writeln!(out, "- Dados temporais não disponíveis para análise de tendências")?;
    }
    for month in &months {
        writeln!(out, "- **{}**: {} em {} vendas", month.key, format_currency(month.revenue), month.count)?;
    }

    writeln!(out, "\n## Segmentação de clientes")?;
    writeln!(out, "**Total de clientes únicos**: {}", agg.distinct_customers)?;
    writeln!(out, "**Regiões ativas**: {}\n", agg.by_region.len())?;
    writeln!(out, "### Top 3 Regiões por Receita:")?;
    write_share_ranking(out, agg, &agg.top_regions(), "- Dados de região não disponíveis")?;

    writeln!(out, "\n## Produtos com melhor e pior desempenho")?;
    writeln!(out, "**Total de produtos únicos**: {}\n", agg.by_product.len())?;
    writeln!(out, "### Top 5 Produtos por Receita:")?;
    let products = agg.top_products(TOP_PRODUCTS);
    if products.is_empty() {
        writeln!(out, "- Dados de produto não disponíveis")?;
    }
    for (i, p) in products.iter().enumerate() {
        writeln!(
            out,
            "{}. **{}**: {} ({} vendas, ticket médio {})",
            i + 1,
            p.key,
            format_currency(p.revenue),
            p.count,
            format_currency(p.average_ticket())
        )?;
    }
    if let Some(worst) = agg.by_product.ranked().last().filter(|_| agg.by_product.len() > TOP_PRODUCTS) {
        writeln!(
            out,
            "\n**Menor receita**: {} com {} em {} vendas",
            worst.key,
            format_currency(worst.revenue),
            worst.count
        )?;
    }

    writeln!(out, "\n## Avaliação da equipe de vendas")?;
    writeln!(out, "**Vendedores únicos**: {}\n", agg.by_seller.len())?;
    let sellers = agg.top_sellers();
    if !sellers.is_empty() {
        writeln!(out, "### Top Vendedores por Receita:")?;
        write_share_ranking(out, agg, &sellers, "")?;
        writeln!(out)?;
    }
    writeln!(out, "### Performance por Categoria:")?;
    write_share_ranking(out, agg, &agg.top_categories(), "- Dados de categoria não disponíveis")?;

    writeln!(out, "\n## Análise geográfica de vendas")?;
    writeln!(out, "**Concentração geográfica**: {} regiões diferentes", agg.by_region.len())?;
    writeln!(
        out,
        "**Receita média por região**: {} (se distribuída igualmente)\n",
        format_currency(agg.revenue_per_region())
    )?;
    writeln!(out, "### Oportunidades de Expansão:")?;
    writeln!(out, "- Focar nas regiões de maior performance")?;
    writeln!(out, "- Investigar regiões com baixo volume de vendas")?;
    writeln!(out, "- Desenvolver estratégias específicas por região")?;

    writeln!(out, "\n## Taxa de conversão e ciclo de venda")?;
    writeln!(out, "**Vendas por dia**: {:.1} vendas/dia (média)", agg.sales_per_day())?;
    writeln!(out, "**Receita por dia**: {}/dia (média)\n", format_currency(agg.revenue_per_day()))?;
    writeln!(out, "### Recomendações Operacionais:")?;
    writeln!(out, "- Otimizar processo de vendas para aumentar volume diário")?;
    writeln!(out, "- Implementar follow-up sistemático para melhorar conversão")?;
    writeln!(out, "- Analisar gargalos no processo de vendas")?;

    writeln!(out, "\n## Comparação com metas")?;
    writeln!(
        out,
        "**Meta sugerida baseada nos dados**: {} (+20% de crescimento)",
        format_currency(agg.revenue_goal())
    )?;
    writeln!(out, "**Vendas necessárias para meta**: {} transações\n", format_decimal(agg.sales_goal(), 0))?;
    writeln!(out, "### Ações para Atingir Meta:")?;
    writeln!(out, "- Aumentar 20% no volume de vendas")?;
    writeln!(out, "- Melhorar ticket médio em 10%")?;
    writeln!(out, "- Focar nas categorias de maior performance")?;

    writeln!(out, "\n## Sazonalidade e oportunidades escondidas")?;
    writeln!(
        out,
        "**Período de análise**: {} a {}\n",
        format_day(agg.first_sale),
        format_day(agg.last_sale)
    )?;
    writeln!(out, "### Padrões Identificados:")?;
    match agg.dated_months().iter().max_by(|a, b| a.revenue.total_cmp(&b.revenue)) {
        Some(peak) => writeln!(
            out,
            "- Mês de maior receita: **{}** com {}",
            peak.key,
            format_currency(peak.revenue)
        )?,
        None => writeln!(out, "- Analisar variações mensais para identificar sazonalidade")?,
    }
    writeln!(out, "- Identificar produtos com potencial de crescimento")?;
    writeln!(out, "- Desenvolver campanhas sazonais específicas")?;

    writeln!(out, "\n---\n")?;
    writeln!(out, "### Resumo Executivo dos Dados")?;
    writeln!(out, "- **Total de Transações**: {}", format_count(agg.total_records))?;
    writeln!(out, "- **Receita Total**: {}", format_currency(total))?;
    writeln!(out, "- **Ticket Médio**: {}", format_currency(agg.average_ticket()))?;
    writeln!(
        out,
        "- **Período**: {}",
        meta.last_update.as_deref().unwrap_or("Dados mais recentes")
    )?;
    writeln!(out, "- **Fonte**: {}\n", meta.source)?;
    writeln!(out, "*Análise gerada em {}*", meta.generated_at.format("%d/%m/%Y às %H:%M"))?;

    Ok(())
}

/// Short data-status block used inside chat answers
pub fn render_overview(agg: &SalesAggregation) -> String {
    if agg.is_empty() {
        return "## **Status dos Dados**\n- ⚠️ Nenhum dado carregado\n- 🔄 Clique em 'Atualizar Dados' para carregar"
            .to_string();
    }

    format!(
        "## **Análise dos Dados Reais**\n\
         - **📊 Total de Registros**: {records}\n\
         - **💰 Receita Total**: {revenue}\n\
         - **🎯 Ticket Médio**: {ticket}\n\
         - **🛍️ Produtos Únicos**: {products}\n\
         - **🌍 Regiões Ativas**: {regions}\n\
         - **📂 Categorias**: {categories}\n\
         \n\
         ## **Insights Baseados em Dados Reais**\n\
         - **Base de Dados**: {records} transações analisadas\n\
         - **Diversificação**: {products} produtos diferentes\n\
         - **Cobertura Geográfica**: {regions} regiões\n\
         - **Segmentação**: {categories} categorias",
        records = format_count(agg.total_records),
        revenue = format_currency(agg.total_revenue),
        ticket = format_currency(agg.average_ticket()),
        products = agg.by_product.len(),
        regions = agg.by_region.len(),
        categories = agg.by_category.len(),
    )
}

fn write_share_ranking(
    out: &mut String,
    agg: &SalesAggregation,
    ranked: &[BucketStats],
    empty_line: &str,
) -> fmt::Result {
    if ranked.is_empty() && !empty_line.is_empty() {
        writeln!(out, "{}", empty_line)?;
    }
    for (i, bucket) in ranked.iter().enumerate() {
        writeln!(
            out,
            "{}. **{}**: {} ({:.1}% do total) - {} vendas",
            i + 1,
            bucket.key,
            format_currency(bucket.revenue),
            agg.revenue_share(bucket.revenue),
            bucket.count
        )?;
    }
    Ok(())
}

fn format_day(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
