use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::collections::BTreeMap;
use treeclean::config::PruneConfig;
use treeclean::model::{Otu, TaxonId, TreeFragment, TreeGraph};
use treeclean::newick::{NewickStyle, to_newick};
use treeclean::prune::Pruner;
use treeclean::taxonomy::InMemoryTaxonomy;

const SPECIES_OFFSET: TaxonId = 100_000;

const TREE_SIZES: &[(&str, usize)] = &[("n100", 100), ("n1k", 1_000), ("n10k", 10_000)];

/// Genera with ten species each below a single root taxon.
fn taxonomy(num_leaves: usize) -> InMemoryTaxonomy {
    let mut taxonomy = InMemoryTaxonomy::new().with_taxon(1, "Life", None);
    for t in 0..=num_leaves as TaxonId {
        let genus = 10 + t / 10;
        if t % 10 == 0 {
            taxonomy = taxonomy.with_taxon(genus, "genus", Some(1));
        }
        taxonomy = taxonomy.with_taxon(SPECIES_OFFSET + t, "species", Some(genus));
    }
    taxonomy
}

/// Caterpillar of cherries: leaf `i` maps to species `i`, every 7th leaf is
/// unmapped and every 13th duplicates its neighbour's taxon.
fn fragment(num_leaves: usize) -> (TreeFragment, BTreeMap<String, Otu>) {
    let mut fragment = TreeFragment::new("v0");
    let mut otus = BTreeMap::new();

    let mut spine = "v0".to_string();
    for i in 0..num_leaves / 2 {
        let next = format!("v{}", i + 1);
        let cherry = format!("c{i}");
        fragment.add_child(&format!("s{i}"), &spine, &next, None);
        fragment.add_child(&format!("k{i}"), &spine, &cherry, None);
        for j in 0..2 {
            let leaf = 2 * i + j;
            let otu_id = format!("o{leaf}");
            let taxon = if leaf % 13 == 0 { leaf + 1 } else { leaf };
            let otu = if leaf % 7 == 0 {
                Otu::unmapped()
            } else {
                Otu::mapped(SPECIES_OFFSET + taxon as TaxonId, "species")
            };
            fragment.add_child(&format!("l{leaf}"), &cherry, &format!("t{leaf}"), Some(&otu_id));
            otus.insert(otu_id, otu);
        }
        spine = next;
    }
    (fragment, otus)
}

fn cleaning(c: &mut Criterion) {
    let config = PruneConfig::default();
    for (name, num_leaves) in TREE_SIZES {
        let taxonomy = taxonomy(*num_leaves);
        let (fragment, otus) = fragment(*num_leaves);
        c.bench_function(&format!("clean_{name}"), |b| {
            b.iter_batched(
                || TreeGraph::from_fragment(&fragment, &otus).unwrap(),
                |graph| Pruner::new(graph).run(&taxonomy, &config).unwrap(),
                BatchSize::LargeInput,
            );
        });
    }
}

fn newick_writing(c: &mut Criterion) {
    for (name, num_leaves) in TREE_SIZES {
        let (fragment, otus) = fragment(*num_leaves);
        let graph = TreeGraph::from_fragment(&fragment, &otus).unwrap();
        c.bench_function(&format!("newick_{name}"), |b| {
            b.iter(|| to_newick(&graph, NewickStyle::Composite, false));
        });
    }
}

criterion_group!(regression, cleaning);
criterion_group! {
    name = reporting;
    config = Criterion::default().sample_size(10);
    targets = newick_writing
}
criterion_main!(regression, reporting);
