use combstruct::parse;
use miette::Report;

fn main() {
    let grammar = r#"
        # Plane binary trees counted by internal nodes
        {
            B = Union(Epsilon, Prod(Z, B, B)),
            F = Sequence(B, card >= 1)
        }
    "#;

    let parsed = parse(grammar, "example.mpl");
    match (parsed.to_text(), parsed.to_json()) {
        (Ok(text), Ok(json)) => {
            println!("{text}");
            println!("{json}");
        }
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Failed to render grammar: {e}");
        }
    }

    match parse("{ A = Set(Z, card < 2) }", "broken.mpl").into_result() {
        Ok(_) => println!("unexpectedly accepted"),
        Err(e) => eprintln!("{:?}", Report::new(e)),
    }
}
