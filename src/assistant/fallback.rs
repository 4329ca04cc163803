//! Local answers used when no remote model responds.
//!
//! The message is classified by keyword and mapped to a canned Markdown
//! template filled with live totals.

use crate::analytics::SalesAggregation;
use crate::report::{format_count, format_currency, render_overview};

pub const NO_DATA_MESSAGE: &str = "# 📊 Dados Não Carregados

**Nenhum dado encontrado para análise.**

## **Para Começar**
1. Clique em **\"Atualizar Dados\"** para carregar informações da planilha
2. Aguarde o carregamento dos dados
3. Depois faça suas perguntas sobre vendas, produtos ou regiões

## **O que Posso Analisar**
- 📈 Performance geral de vendas
- 🛍️ Produtos mais vendidos
- 🌍 Análise por região
- 📊 Tendências temporais
- 🎯 Oportunidades de crescimento

*Carregue os dados primeiro e depois faça suas perguntas!*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Sales,
    Product,
    Region,
    Analysis,
    Help,
    General,
}

/// Checked in this order; the first matching set wins
const KEYWORDS: &[(Intent, &[&str])] = &[
    (Intent::Sales, &["vendas", "venda", "performance", "resultado", "resumo"]),
    (Intent::Product, &["produto", "produtos", "item", "itens", "top"]),
    (Intent::Region, &["região", "regiões", "geográfico", "localização", "onde"]),
    (Intent::Analysis, &["análise", "analisar", "relatório", "relatorio", "insights"]),
    (Intent::Help, &["ajuda", "help", "comandos", "como usar", "o que posso"]),
];

pub fn classify(message: &str) -> Intent {
    let lower = message.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::General)
}

/// Keyword-matched answer, or the no-data message when nothing is loaded
pub fn local_answer(message: &str, agg: Option<&SalesAggregation>) -> String {
    match agg.filter(|a| !a.is_empty()) {
        Some(agg) => answer_for(classify(message), agg),
        None => NO_DATA_MESSAGE.to_string(),
    }
}

pub fn answer_for(intent: Intent, agg: &SalesAggregation) -> String {
    let records = format_count(agg.total_records);
    let revenue = format_currency(agg.total_revenue);
    let ticket = format_currency(agg.average_ticket());

    match intent {
        Intent::Sales => format!(
            "# 📊 Resumo de Vendas Atual

## **Métricas Principais**
- **Total de Transações**: {records}
- **Receita Total**: {revenue}
- **Ticket Médio**: {ticket}

{overview}

## **Insights Estratégicos**
Com base nos seus dados, posso identificar padrões importantes e oportunidades de crescimento. Sua base de {records} transações oferece uma visão robusta do desempenho.

## **Próximos Passos Recomendados**
- Analisar tendências mensais para identificar sazonalidade
- Investigar produtos com maior potencial de crescimento
- Avaliar oportunidades de expansão geográfica

*Que aspecto específico gostaria de investigar mais profundamente?*",
            overview = render_overview(agg),
        ),
        Intent::Product => {
            let leader = agg
                .top_products(1)
                .first()
                .map(|p| format!("\n- **Produto líder**: {} ({})", p.key, format_currency(p.revenue)))
                .unwrap_or_default();
            format!(
                "# 🛍️ Análise de Produtos

## **Dados Disponíveis**
- **Total de Transações**: {records}
- **Receita Total**: {revenue}
- **Ticket Médio**: {ticket}
- **Produtos Únicos**: {products}{leader}

## **Insights Disponíveis**
- **Ranking de Produtos**: Top performers por receita
- **Análise de Categorias**: Performance por segmento
- **Oportunidades de Crescimento**: Produtos com potencial

## **Recomendações Estratégicas**
- Focar nos produtos de maior performance
- Investigar produtos com baixo volume mas alto ticket
- Desenvolver estratégias específicas por categoria

*Gostaria de ver o ranking completo de produtos ou focar em alguma categoria específica?*",
                products = agg.by_product.len(),
            )
        }
        Intent::Region => {
            let leader = agg
                .top_regions()
                .first()
                .map(|r| {
                    format!(
                        "\n- **Região líder**: {} ({:.1}% da receita)",
                        r.key,
                        agg.revenue_share(r.revenue)
                    )
                })
                .unwrap_or_default();
            format!(
                "# 🌍 Análise Geográfica

## **Distribuição Geográfica**
- **Regiões Ativas**: {regions}{leader}
- **Receita Total**: {revenue}

## **Insights Geográficos**
- **Concentração de Vendas**: Identificar regiões de maior performance
- **Oportunidades de Expansão**: Regiões com potencial de crescimento
- **Estratégias Regionais**: Abordagens específicas por localização

*Qual região gostaria de analisar em detalhes?*",
                regions = agg.by_region.len(),
            )
        }
        Intent::Analysis => format!(
            "# 📈 Relatórios e Análises Disponíveis

## **Análises Estruturadas**
- **📊 Tendências Temporais**: Variações por período
- **🛍️ Performance de Produtos**: Rankings e oportunidades
- **🌍 Análise Geográfica**: Concentração e expansão
- **👥 Segmentação de Clientes**: Comportamento e preferências

## **Dados Base para Análise**
- **{records}** transações analisadas
- **{revenue}** em receita total
- **{categories}** categorias e **{products}** produtos

*Que tipo de relatório gostaria de gerar?*",
            categories = agg.by_category.len(),
            products = agg.by_product.len(),
        ),
        Intent::Help => format!(
            "# 🤖 Como Posso Ajudar?

## **Comandos Principais**
- **\"Mostre as vendas\"** - Resumo geral de performance
- **\"Produtos mais vendidos\"** - Ranking de produtos
- **\"Análise por região\"** - Performance geográfica
- **\"Gere um relatório\"** - Análise estruturada completa

## **Seus Dados Atuais**
- **{records}** transações processadas
- **{revenue}** em receita total

*Digite sua pergunta para começar a análise!*"
        ),
        Intent::General => format!(
            "# 💡 Interessante Pergunta!

Com base nos seus **{records}** registros de vendas, posso ajudá-lo com:

## **Análises Disponíveis**
- **📊 Performance Geral**: Métricas e indicadores
- **🛍️ Análise de Produtos**: Rankings e oportunidades
- **🌍 Análise Geográfica**: Concentração e expansão
- **📈 Tendências Temporais**: Variações e padrões

## **Sugestões de Perguntas**
- \"Mostre os produtos mais vendidos\"
- \"Qual região tem melhor performance?\"
- \"Gere um relatório executivo\"

*Pode ser mais específico sobre o que gostaria de analisar?*"
        ),
    }
}
