//! A compressed radix tree keyed by strings.
//!
//! Used by the ACL to hold exact and glob rules. Lookups walk at most one
//! edge per byte of the key, so both exact and longest-prefix queries are
//! independent of how many rules are stored. Children are kept sorted by
//! their first byte and located with binary search.

/// A compressed trie mapping string keys to values.
#[derive(Debug, Clone)]
pub struct RadixTree<V> {
    root: Node<V>,
    len: usize,
}

#[derive(Debug, Clone)]
struct Node<V> {
    value: Option<V>,
    edges: Vec<Edge<V>>,
}

#[derive(Debug, Clone)]
struct Edge<V> {
    label: Vec<u8>,
    node: Node<V>,
}

impl<V> Node<V> {
    fn empty() -> Self {
        Self {
            value: None,
            edges: Vec::new(),
        }
    }

    fn leaf(value: V) -> Self {
        Self {
            value: Some(value),
            edges: Vec::new(),
        }
    }

    fn edge_index(&self, first: u8) -> Result<usize, usize> {
        self.edges.binary_search_by_key(&first, |edge| edge.label[0])
    }

    fn add_edge(&mut self, edge: Edge<V>) {
        let idx = self.edge_index(edge.label[0]).unwrap_or_else(|idx| idx);
        self.edges.insert(idx, edge);
    }
}

impl<V> Default for RadixTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RadixTree<V> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            root: Node::empty(),
            len: 0,
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert `value` at `key`, returning the previous value if any.
    pub fn insert(&mut self, key: &str, value: V) -> Option<V> {
        let mut node = &mut self.root;
        let mut search = key.as_bytes();

        loop {
            if search.is_empty() {
                let old = node.value.replace(value);
                if old.is_none() {
                    self.len += 1;
                }
                return old;
            }

            let idx = match node.edge_index(search[0]) {
                Ok(idx) => idx,
                Err(idx) => {
                    node.edges.insert(
                        idx,
                        Edge {
                            label: search.to_vec(),
                            node: Node::leaf(value),
                        },
                    );
                    self.len += 1;
                    return None;
                }
            };

            let edge = &mut node.edges[idx];
            let common = common_prefix_len(&edge.label, search);

            if common == edge.label.len() {
                search = &search[common..];
                node = &mut edge.node;
                continue;
            }

            // Split the edge at the divergence point.
            let suffix = edge.label.split_off(common);
            let child = std::mem::replace(&mut edge.node, Node::empty());
            edge.node.edges.push(Edge {
                label: suffix,
                node: child,
            });

            let rest = &search[common..];
            if rest.is_empty() {
                edge.node.value = Some(value);
            } else {
                edge.node.add_edge(Edge {
                    label: rest.to_vec(),
                    node: Node::leaf(value),
                });
            }
            self.len += 1;
            return None;
        }
    }

    /// Get the value stored at exactly `key`.
    pub fn get(&self, key: &str) -> Option<&V> {
        let mut node = &self.root;
        let mut search = key.as_bytes();

        loop {
            if search.is_empty() {
                return node.value.as_ref();
            }

            let idx = node.edge_index(search[0]).ok()?;
            let edge = &node.edges[idx];
            if !search.starts_with(&edge.label) {
                return None;
            }
            search = &search[edge.label.len()..];
            node = &edge.node;
        }
    }

    /// Find the longest stored key that is a prefix of `key`.
    ///
    /// Returns the matched prefix and its value.
    pub fn longest_prefix<'k>(&self, key: &'k str) -> Option<(&'k str, &V)> {
        let bytes = key.as_bytes();
        let mut node = &self.root;
        let mut consumed = 0;
        let mut best = node.value.as_ref().map(|value| (0, value));

        while consumed < bytes.len() {
            let search = &bytes[consumed..];
            let Ok(idx) = node.edge_index(search[0]) else {
                break;
            };
            let edge = &node.edges[idx];
            if !search.starts_with(&edge.label) {
                break;
            }
            consumed += edge.label.len();
            node = &edge.node;
            if let Some(value) = node.value.as_ref() {
                best = Some((consumed, value));
            }
        }

        let (len, value) = best?;
        Some((key.get(..len)?, value))
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
