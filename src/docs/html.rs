//! HTML renderer.
//!
//! Blocks are laid out by a minijinja page template. The template name ends in
//! `.html`, so every interpolated value is HTML-escaped.

use minijinja::{context, Environment};

use super::Document;
use crate::error::Result;

const PAGE_TEMPLATE_NAME: &str = "page.html";

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{ doc.title }}</title>
{%- if doc.description %}
  <meta name="description" content="{{ doc.description }}">
{%- endif %}
  <style>
    body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif; line-height: 1.5; color: #24292f; max-width: 1012px; margin: 0 auto; padding: 32px; }
    h1, h2 { border-bottom: 1px solid #d0d7de; padding-bottom: .3em; }
    table { border-collapse: collapse; margin: 16px 0; }
    th, td { border: 1px solid #d0d7de; padding: 6px 13px; text-align: left; vertical-align: top; }
    th { background: #f6f8fa; }
    code { background: #f6f8fa; border-radius: 6px; padding: .2em .4em; font-size: 85%; }
    pre { background: #f6f8fa; border-radius: 6px; padding: 16px; overflow: auto; }
    pre code { background: none; padding: 0; }
    blockquote { border-left: .25em solid #d0d7de; color: #57606a; margin: 0; padding: 0 1em; }
    img { max-width: 100%; }
  </style>
  <script type="module">
    import mermaid from "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.esm.min.mjs";
    mermaid.initialize({ startOnLoad: true });
  </script>
</head>
<body>
{%- macro spans(items) -%}
{%- for s in items -%}
{%- if s.kind == "code" -%}<code>{{ s.text }}</code>
{%- elif s.kind == "strong" -%}<strong>{{ s.text }}</strong>
{%- elif s.kind == "link" -%}<a href="{{ s.url }}">{{ s.text }}</a>
{%- else -%}{{ s.text }}
{%- endif -%}
{%- endfor -%}
{%- endmacro %}
{%- for block in doc.blocks %}
{%- if block.kind == "heading" %}
<h{{ block.level }}>{{ block.text }}</h{{ block.level }}>
{%- elif block.kind == "paragraph" %}
<p>{{ spans(block.spans) }}</p>
{%- elif block.kind == "table" %}
<table>
  <thead><tr>{% for h in block.headers %}<th>{{ h }}</th>{% endfor %}</tr></thead>
  <tbody>
{%- for row in block.rows %}
    <tr>{% for cell in row %}<td>{{ spans(cell) }}</td>{% endfor %}</tr>
{%- endfor %}
  </tbody>
</table>
{%- elif block.kind == "code_block" %}
{%- if block.language == "mermaid" %}
<pre class="mermaid">{{ block.code }}</pre>
{%- else %}
<pre><code{% if block.language %} class="language-{{ block.language }}"{% endif %}>{{ block.code }}</code></pre>
{%- endif %}
{%- elif block.kind == "list" %}
{%- if block.ordered %}
<ol>{% for item in block.items %}<li>{{ spans(item) }}</li>{% endfor %}</ol>
{%- else %}
<ul>{% for item in block.items %}<li>{{ spans(item) }}</li>{% endfor %}</ul>
{%- endif %}
{%- elif block.kind == "quote" %}
<blockquote>
{%- for para in block.paragraphs %}
  <p>{{ para }}</p>
{%- endfor %}
</blockquote>
{%- elif block.kind == "image" %}
<p><img src="{{ block.src }}" alt="{{ block.alt }}"></p>
{%- endif %}
{%- endfor %}
</body>
</html>
"#;

/// Render a document as a standalone HTML page.
pub fn render_html(doc: &Document) -> Result<String> {
    let mut env = Environment::new();
    env.add_template(PAGE_TEMPLATE_NAME, PAGE_TEMPLATE)?;
    let template = env.get_template(PAGE_TEMPLATE_NAME)?;
    Ok(template.render(context! { doc => doc })?)
}
